//! Shared types for the MedDRA lake.
//!
//! Everything that both the conversion pipeline and the catalog pipeline must
//! agree on lives here: the version normalizer that produces the partition
//! key, the storage path layout derived from it, and the trigger notification
//! payload. The two pipelines never call each other, so this crate is their
//! only coupling point.

pub mod notification;
pub mod paths;
pub mod version;

pub use notification::{ObjectEvent, StorageNotification};
pub use version::{CanonicalVersion, InvalidVersion};
