//! XFS Quota Manager - Entry Point
//!
//! Reconciles configured storage quotas against XFS project quotas, either
//! pushing them out (apply) or reporting drift (audit).

use log::{error, info};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;

use xfs_quota_manager::{QuotaService, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mode = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "audit".to_string());
    info!("Launching XFS quota manager in {} mode...", mode);

    let service = QuotaService::new(Arc::new(settings));

    match mode.as_str() {
        "apply" => run_apply(&service).await,
        "audit" => run_audit(&service).await,
        "usage" => run_usage(&service).await,
        other => {
            error!("Unknown mode '{}', expected apply, audit or usage", other);
            ExitCode::FAILURE
        }
    }
}

/// Push the configured quotas out to every managed folder
async fn run_apply(service: &QuotaService) -> ExitCode {
    if let Err(e) = service.apply_all() {
        error!("Apply pass failed: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = service.flush().await {
        error!("Apply pass did not finish: {}", e);
        return ExitCode::FAILURE;
    }
    info!("Apply pass complete");
    ExitCode::SUCCESS
}

/// Report policy drift without mutating anything
async fn run_audit(service: &QuotaService) -> ExitCode {
    let report = service.health().await;
    if let Err(e) = print_json(&report) {
        error!("Failed to render audit report: {}", e);
        return ExitCode::FAILURE;
    }
    if report.healthy {
        info!("Audit found no problems");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print the usage snapshot for every managed folder
async fn run_usage(service: &QuotaService) -> ExitCode {
    let samples = match service.list_usage().await {
        Ok(samples) => samples,
        Err(e) => {
            error!("Usage query failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = print_json(&samples) {
        error!("Failed to render usage: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
