//! Serverless replica mode for Yoriai rooms.
//!
//! Each replica keeps the room record in a shared local store, announces its
//! writes through a store-change notification and re-reads the record on
//! every notification or poll tick.
//!
//! Concurrent writers are last-write-wins on the whole record; there is no
//! merge.

pub mod config;
pub mod runner;
pub mod store;
pub mod synchronizer;

pub use config::ReplicaConfig;
pub use runner::{ReplicaRunner, RunnerHandle};
pub use store::{InMemorySharedStore, RoomRecord, SharedStore, StoreError, store_key};
pub use synchronizer::ReplicaSynchronizer;
