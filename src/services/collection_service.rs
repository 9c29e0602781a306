//! CollectionLifecycleManager: creates and deletes the face collection in
//! response to provisioning events from an external orchestrator.
//!
//! The orchestrator blocks until it receives exactly one callback per event.
//! `handle` therefore has a single exit that sends it: the face-service work
//! runs isolated (errors, timeouts and panics all captured) and only its
//! settled state decides the callback status.

use crate::{
    errors::{Dependency, FaceIndexError, FaceIndexResult},
    models::provisioning::{
        CallbackResponse, CallbackStatus, HandshakeState, ProvisioningEvent, RequestType,
    },
    services::{
        bounded,
        callback_client::{CallbackError, CallbackSender},
        face_client::FaceService,
    },
};
use futures::FutureExt;
use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tracing::{debug, error, info};

pub struct CollectionLifecycleManager {
    faces: Arc<dyn FaceService>,
    callbacks: Arc<dyn CallbackSender>,
    /// Reported as `PhysicalResourceId`; the log stream of this process.
    physical_resource_id: String,
    timeout: Duration,
}

impl CollectionLifecycleManager {
    pub fn new(
        faces: Arc<dyn FaceService>,
        callbacks: Arc<dyn CallbackSender>,
        physical_resource_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            faces,
            callbacks,
            physical_resource_id: physical_resource_id.into(),
            timeout,
        }
    }

    /// Process one provisioning event and send its callback.
    ///
    /// Face-service failures never escape; they become a `FAILED` callback.
    /// The only error returned is a failure to deliver that callback.
    pub async fn handle(&self, event: &ProvisioningEvent) -> Result<CallbackStatus, CallbackError> {
        let mut state = HandshakeState::Received;
        info!(
            request_type = ?event.request_type,
            request_id = %event.request_id,
            collection = %event.resource_properties.collection_name,
            ?state,
            "provisioning event received"
        );

        state = HandshakeState::Processing;
        debug!(request_id = %event.request_id, ?state, "applying collection change");
        let outcome = AssertUnwindSafe(self.apply(event))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(FaceIndexError::Provisioning(panic_message(panic))));

        state = match outcome {
            Ok(()) => HandshakeState::Succeeded,
            Err(err) => {
                error!(request_id = %event.request_id, error = %err, "collection change failed");
                HandshakeState::Failed
            }
        };
        let status = state.callback_status().unwrap_or(CallbackStatus::Failed);

        let response = CallbackResponse::for_event(event, status, &self.physical_resource_id);
        tokio::time::timeout(
            self.timeout,
            self.callbacks.send(&event.response_url, &response),
        )
        .await
        .map_err(|_| CallbackError::Timeout)?
        .inspect_err(|err| {
            error!(
                request_id = %event.request_id,
                error = %err,
                "provisioning callback not delivered"
            )
        })?;

        info!(request_id = %event.request_id, ?state, ?status, "provisioning callback sent");
        Ok(status)
    }

    async fn apply(&self, event: &ProvisioningEvent) -> FaceIndexResult<()> {
        let collection = event.resource_properties.collection_name.as_str();
        // An update only arrives when the collection name changed, so it
        // provisions the new collection.
        let call = match event.request_type {
            RequestType::Create | RequestType::Update => self.faces.create_collection(collection),
            RequestType::Delete => self.faces.delete_collection(collection),
        };

        bounded(self.timeout, Dependency::FaceService, call)
            .await
            .map_err(|err| FaceIndexError::Provisioning(err.to_string()))
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => panic
            .downcast_ref::<&'static str>()
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| "face service call panicked".to_string()),
    }
}
