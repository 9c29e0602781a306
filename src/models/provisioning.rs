//! Custom-resource provisioning events and the completion callback they require.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Event sent by the external orchestrator when the collection resource is
/// created, updated or removed.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub resource_properties: ResourceProperties,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    pub collection_name: String,
}

/// Lifecycle of one provisioning request.
///
/// `Received → Processing → {Succeeded | Failed}`; only the two terminal
/// states produce a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Received,
    Processing,
    Succeeded,
    Failed,
}

impl HandshakeState {
    pub fn callback_status(self) -> Option<CallbackStatus> {
        match self {
            HandshakeState::Succeeded => Some(CallbackStatus::Success),
            HandshakeState::Failed => Some(CallbackStatus::Failed),
            HandshakeState::Received | HandshakeState::Processing => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackStatus {
    Success,
    Failed,
}

/// Body PUT to the orchestrator's one-time response URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackResponse {
    pub status: CallbackStatus,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Map<String, Value>,
}

impl CallbackResponse {
    pub fn for_event(
        event: &ProvisioningEvent,
        status: CallbackStatus,
        physical_resource_id: impl Into<String>,
    ) -> Self {
        Self {
            status,
            physical_resource_id: physical_resource_id.into(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data: Map::new(),
        }
    }
}
