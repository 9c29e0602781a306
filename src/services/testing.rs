//! In-memory fakes of the capability traits, with call counters.

use crate::models::{
    enrollment::EnrollmentRecord,
    face::{FaceMatch, ObjectRef},
    provisioning::CallbackResponse,
};
use crate::services::{
    callback_client::{CallbackError, CallbackSender},
    face_client::{FaceService, FaceServiceError, FaceServiceResult},
    mapping_store::{MappingStore, MappingStoreError, MappingStoreResult},
    object_store::{ObjectMetadata, ObjectStore, ObjectStoreError, ObjectStoreResult},
};
use async_trait::async_trait;
use chrono::Duration;
use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

/// How a fake dependency reacts to every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Succeed,
    Fail,
    Panic,
    Hang,
    /// Succeeds after [`SLOW_CALL`].
    Slow,
}

pub const SLOW_CALL: std::time::Duration = std::time::Duration::from_millis(200);

async fn react(behavior: Behavior) -> Result<(), String> {
    match behavior {
        Behavior::Succeed => Ok(()),
        Behavior::Fail => Err("injected failure".into()),
        Behavior::Panic => panic!("injected panic"),
        Behavior::Hang => std::future::pending().await,
        Behavior::Slow => {
            tokio::time::sleep(SLOW_CALL).await;
            Ok(())
        }
    }
}

#[derive(Default)]
pub struct FakeFaceService {
    pub behavior: Behavior,
    /// Faces reported per indexing call. Each call mints fresh ids.
    pub faces_per_image: usize,
    /// Candidates the search returns before threshold filtering.
    pub candidates: Vec<FaceMatch>,
    pub calls: AtomicUsize,
    pub collections: Mutex<Vec<(String, String)>>,
}

impl FakeFaceService {
    pub fn indexing(faces_per_image: usize) -> Self {
        Self {
            faces_per_image,
            ..Self::default()
        }
    }

    pub fn searching(candidates: Vec<FaceMatch>) -> Self {
        Self {
            candidates,
            ..Self::default()
        }
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> FaceServiceResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        react(self.behavior)
            .await
            .map_err(FaceServiceError::Unavailable)
    }
}

#[async_trait]
impl FaceService for FakeFaceService {
    async fn create_collection(&self, collection_id: &str) -> FaceServiceResult<()> {
        self.enter().await?;
        self.collections
            .lock()
            .unwrap()
            .push(("create".into(), collection_id.into()));
        Ok(())
    }

    async fn delete_collection(&self, collection_id: &str) -> FaceServiceResult<()> {
        self.enter().await?;
        self.collections
            .lock()
            .unwrap()
            .push(("delete".into(), collection_id.into()));
        Ok(())
    }

    async fn index_face(
        &self,
        _collection_id: &str,
        _object: &ObjectRef,
    ) -> FaceServiceResult<Vec<FaceMatch>> {
        self.enter().await?;
        Ok((0..self.faces_per_image)
            .map(|_| FaceMatch::new(format!("face-{}", Uuid::new_v4()), 99.5))
            .collect())
    }

    async fn search_by_image(
        &self,
        _collection_id: &str,
        _image: &[u8],
        max_candidates: usize,
        min_confidence: f32,
    ) -> FaceServiceResult<Vec<FaceMatch>> {
        self.enter().await?;
        Ok(self
            .candidates
            .iter()
            .filter(|m| m.confidence >= min_confidence)
            .take(max_candidates)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryMappingStore {
    pub behavior: Behavior,
    pub records: Mutex<BTreeMap<String, EnrollmentRecord>>,
    pub calls: AtomicUsize,
}

impl InMemoryMappingStore {
    pub fn with_records(records: impl IntoIterator<Item = EnrollmentRecord>) -> Self {
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|r| (r.face_id.clone(), r))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<EnrollmentRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    async fn enter(&self) -> MappingStoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        react(self.behavior)
            .await
            .map_err(MappingStoreError::Unavailable)
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn put(&self, record: &EnrollmentRecord) -> MappingStoreResult<()> {
        self.enter().await?;
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.face_id) {
            return Err(MappingStoreError::DuplicateFace(record.face_id.clone()));
        }
        records.insert(record.face_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, face_id: &str) -> MappingStoreResult<Option<EnrollmentRecord>> {
        self.enter().await?;
        Ok(self.records.lock().unwrap().get(face_id).cloned())
    }

    async fn scan_all(&self) -> MappingStoreResult<Vec<EnrollmentRecord>> {
        self.enter().await?;
        let mut all = self.snapshot();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn ping(&self) -> MappingStoreResult<()> {
        self.enter().await
    }
}

#[derive(Default)]
pub struct FakeObjectStore {
    pub behavior: Behavior,
    /// Metadata returned by `head_object`, keyed by object key.
    pub metadata: HashMap<String, ObjectMetadata>,
    pub presign_calls: AtomicUsize,
}

impl FakeObjectStore {
    pub fn with_object(key: &str, metadata: ObjectMetadata) -> Self {
        Self {
            metadata: HashMap::from([(key.to_string(), metadata)]),
            ..Self::default()
        }
    }

    pub fn presign_count(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        _metadata: &ObjectMetadata,
        ttl: Duration,
    ) -> ObjectStoreResult<String> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        react(self.behavior)
            .await
            .map_err(ObjectStoreError::Unavailable)?;
        Ok(format!(
            "https://uploads.test/{}?type={}&ttl={}",
            key,
            content_type,
            ttl.num_seconds()
        ))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> ObjectStoreResult<ObjectMetadata> {
        react(self.behavior)
            .await
            .map_err(ObjectStoreError::Unavailable)?;
        self.metadata
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[derive(Default)]
pub struct RecordingCallbacks {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, CallbackResponse)>>,
}

impl RecordingCallbacks {
    pub fn sent(&self) -> Vec<(String, CallbackResponse)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackSender for RecordingCallbacks {
    async fn send(&self, response_url: &str, body: &CallbackResponse) -> Result<(), CallbackError> {
        self.sent
            .lock()
            .unwrap()
            .push((response_url.to_string(), body.clone()));
        if self.fail {
            return Err(CallbackError::Delivery("injected failure".into()));
        }
        Ok(())
    }
}

/// Buffer that collects formatted tracing output for assertions.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route events on the current thread into a fresh buffer until the guard drops.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
