//! FaceRosterReader: lists every enrolled person for display.

use crate::{
    errors::{Dependency, FaceIndexResult},
    models::enrollment::{EnrollmentRecord, RosterEntry},
    services::{bounded, mapping_store::MappingStore},
};
use std::{sync::Arc, time::Duration};
use tracing::debug;

pub struct FaceRosterReader {
    mappings: Arc<dyn MappingStore>,
    /// Public origin images are served from, e.g. a CDN in front of the bucket.
    public_base_url: String,
    timeout: Duration,
}

impl FaceRosterReader {
    pub fn new(
        mappings: Arc<dyn MappingStore>,
        public_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            mappings,
            public_base_url: public_base_url.into(),
            timeout,
        }
    }

    /// All enrollments, unfiltered. Store failures propagate.
    pub async fn list(&self) -> FaceIndexResult<Vec<RosterEntry>> {
        let records = bounded(
            self.timeout,
            Dependency::MappingStore,
            self.mappings.scan_all(),
        )
        .await?;
        debug!(count = records.len(), "listing enrolled faces");

        Ok(records.iter().map(|r| self.entry(r)).collect())
    }

    fn entry(&self, record: &EnrollmentRecord) -> RosterEntry {
        RosterEntry {
            image_url: format!(
                "{}/{}",
                self.public_base_url.trim_end_matches('/'),
                record.image_key.trim_start_matches('/')
            ),
            full_name: record.person_name.clone(),
        }
    }
}
