//! redb-backed download counter, the transactional alternative to the shared
//! JSON counter file.

mod counts;
pub mod db;
mod tables;

pub use db::{Database, DatabaseError, PurgeStats};
pub use tables::*;
