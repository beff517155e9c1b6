pub mod backend;
pub mod config;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod service;

pub use backend::QuotaSample;
pub use config::Settings;
pub use reconcile::{Problem, ProblemKind};
pub use service::{HealthReport, QuotaService};
