//! Core types and the query engine for the Navette record stores.
//!
//! This crate is deliberately free of async runtime and I/O dependencies.
//! Filtering, ordering and counting are pure functions over slices of
//! records; the [`persistence::Persistence`] trait describes the backing
//! store that `navette-store` drives.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod filter;
pub mod id;
pub mod persistence;
pub mod query;
pub mod sort;

pub use entity::{Entity, FilterSpec, Placement};
pub use error::{Error, ErrorKind, Result};
pub use id::RecordId;
