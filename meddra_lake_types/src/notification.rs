//! Storage-write notification payload that triggers a pipeline run.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single changed object, addressed by bucket and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub bucket: String,
    pub key: String,
}

impl ObjectEvent {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The object key with URL encoding undone (`+` as space, percent
    /// escapes decoded). Notification transports escape keys containing
    /// spaces or non-ASCII characters; storage wants the literal key.
    pub fn decoded_key(&self) -> String {
        let plus_decoded = self.key.replace('+', " ");
        match urlencoding::decode(&plus_decoded) {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(key = %self.key, %error, "object key is not valid URL encoding, using it verbatim");
                plus_decoded
            }
        }
    }
}

/// The notification body delivered to a triggered run.
///
/// Carries one or more object records, but a run only ever processes the
/// first; multi-record notifications are not supported and the extras are
/// logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageNotification {
    pub records: Vec<ObjectEvent>,
}

impl StorageNotification {
    pub fn primary_event(&self) -> Option<&ObjectEvent> {
        if self.records.len() > 1 {
            warn!(
                dropped = self.records.len() - 1,
                "multi-record notification, only the first record is processed"
            );
        }
        self.records.first()
    }
}
