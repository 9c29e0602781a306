//! Core data models for the face enrollment and recognition service.
//!
//! Enrollment records map cleanly to the `enrollments` table via
//! `sqlx::FromRow`; the rest are wire or transient values that serialize via
//! `serde`.

pub mod enrollment;
pub mod face;
pub mod provisioning;
pub mod storage_event;
pub mod upload;
