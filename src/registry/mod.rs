//! XFS project registry
//!
//! Maintains the projects/projid file pair, allocates project ids, and
//! serializes all mutations through a single worker task.

pub mod allocator;
pub mod store;
pub mod worker;

// Re-export the pieces the backend and service work with
pub use allocator::{MAX_PROJECT_ID, MIN_PROJECT_ID, first_free_id};
pub use store::ProjectStore;
pub use worker::{MutationJob, QuotaWorker};
