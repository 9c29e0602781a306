//! Object-created notifications emitted by the upload store.

use serde::Deserialize;

/// An object that has landed in storage and is ready for indexing.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
}

/// Accepted notification shapes.
///
/// Either a bare `{bucket, key}` pair, or the S3 event format where keys
/// arrive form-urlencoded.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum StorageEvent {
    Object(StoredObject),
    Notification {
        #[serde(rename = "Records")]
        records: Vec<NotificationRecord>,
    },
}

#[derive(Deserialize, Debug)]
pub struct NotificationRecord {
    pub s3: NotificationEntity,
}

#[derive(Deserialize, Debug)]
pub struct NotificationEntity {
    pub bucket: NotificationBucket,
    pub object: NotificationObject,
}

#[derive(Deserialize, Debug)]
pub struct NotificationBucket {
    pub name: String,
}

#[derive(Deserialize, Debug)]
pub struct NotificationObject {
    pub key: String,
}

impl StorageEvent {
    /// Flatten the event into the objects it announces, decoding keys as needed.
    pub fn into_objects(self) -> Vec<StoredObject> {
        match self {
            StorageEvent::Object(object) => vec![object],
            StorageEvent::Notification { records } => records
                .into_iter()
                .map(|record| StoredObject {
                    bucket: record.s3.bucket.name,
                    key: decode_event_key(&record.s3.object.key),
                })
                .collect(),
        }
    }
}

/// S3 notifications encode keys like form values: `+` for space, `%XX` escapes.
/// Reserved characters (`&`, `=`) always arrive escaped, so the raw key parses
/// as a single form pair.
fn decode_event_key(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}
