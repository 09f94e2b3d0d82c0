//! iOS simulator backend built on idb (iOS Development Bridge)
//!
//! Requires `idb` and a running `idb_companion` on macOS.

pub mod backend;
pub mod idb;

pub use backend::IdbBackend;
pub use idb::IdbClient;
