//! aat-core - Core library for AAT booking sync
//!
//! This crate contains the shared entity models, the cloud document and its
//! merge rules, the document store backends, local client storage and the
//! sync client used by the endpoint and the CLI.

pub mod config;
pub mod document;
pub mod error;
pub mod local;
pub mod merge;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

pub use document::{CloudDocument, PushAck, PushPayload, RecordCount};
pub use error::{Error, Result};
pub use models::{Collection, Entity};
pub use sync::{SyncClient, SyncError, SyncStatus};
