//! XFS quota backend
//!
//! Issues xfs_quota commands for the quota operations and parses the usage
//! reports they produce.

pub mod command;
pub mod report;
pub mod xfs;

pub use command::CommandRunner;
pub use report::{QuotaSample, ReportLine};
pub use xfs::XfsBackend;
