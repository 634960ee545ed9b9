//! Database access layer
//
// Connection pool setup
mod pool;
//
// Status table repository
mod status;

pub use pool::connect_pool;
pub use status::{PgStatusStore, StatusStore, StatusStoreError};
