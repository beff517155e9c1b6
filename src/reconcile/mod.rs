//! Reconciliation of quota policy against the filesystem
//!
//! Walks each root volume two levels deep and either pushes the policy to
//! the backend (apply) or diffs it against live usage (audit).

pub mod apply;
pub mod audit;
pub mod walk;

pub use apply::apply_all;
pub use audit::{OVERAGE_TOLERANCE, Problem, ProblemKind, audit_volumes};
pub use walk::{VolumeFolder, volume_folders};
