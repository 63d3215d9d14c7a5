//! Record stores for Navette: the mutation gateway and its backends.
//!
//! [`RecordStore`] owns the settled records of one entity kind, serialises
//! mutations against a [`Persistence`](navette_core::persistence::Persistence)
//! backend, and republishes a freshly derived view after every change.

mod notification;
mod store;

pub mod config;
pub mod error;
pub mod file;
pub mod memory;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use store::{RecordStore, Snapshot};
