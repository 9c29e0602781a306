//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        callback_client::CallbackSender,
        collection_service::CollectionLifecycleManager,
        face_client::FaceService,
        indexing_service::FaceIndexer,
        mapping_store::MappingStore,
        object_store::ObjectStore,
        recognition_service::FaceRecognizer,
        roster_service::FaceRosterReader,
        upload_service::UploadGrantIssuer,
    },
};
use std::sync::Arc;

/// External collaborators, injected once at startup.
#[derive(Clone)]
pub struct Collaborators {
    pub faces: Arc<dyn FaceService>,
    pub objects: Arc<dyn ObjectStore>,
    pub mappings: Arc<dyn MappingStore>,
    pub callbacks: Arc<dyn CallbackSender>,
}

/// Immutable per-process state. Cloning is cheap; nothing in here is mutated
/// after startup.
#[derive(Clone)]
pub struct AppState {
    pub uploads: Arc<UploadGrantIssuer>,
    pub indexer: Arc<FaceIndexer>,
    pub recognizer: Arc<FaceRecognizer>,
    pub roster: Arc<FaceRosterReader>,
    pub collections: Arc<CollectionLifecycleManager>,
    pub mappings: Arc<dyn MappingStore>,
}

impl AppState {
    pub fn new(cfg: &AppConfig, deps: Collaborators) -> Self {
        let timeout = cfg.dependency_timeout();
        Self {
            uploads: Arc::new(UploadGrantIssuer::new(
                deps.objects.clone(),
                cfg.upload_prefix.clone(),
                timeout,
            )),
            indexer: Arc::new(FaceIndexer::new(
                deps.faces.clone(),
                deps.objects,
                deps.mappings.clone(),
                cfg.collection_id.clone(),
                timeout,
            )),
            recognizer: Arc::new(FaceRecognizer::new(
                deps.faces.clone(),
                deps.mappings.clone(),
                cfg.collection_id.clone(),
                cfg.match_threshold,
                timeout,
            )),
            roster: Arc::new(FaceRosterReader::new(
                deps.mappings.clone(),
                cfg.public_base_url.clone(),
                timeout,
            )),
            collections: Arc::new(CollectionLifecycleManager::new(
                deps.faces,
                deps.callbacks,
                cfg.log_stream_name.clone(),
                timeout,
            )),
            mappings: deps.mappings,
        }
    }
}
