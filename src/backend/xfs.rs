//! xfs_quota operations
//!
//! Builds and runs the xfs_quota invocations behind the quota operations,
//! keeping the project files in step with the commands issued.

use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::{RootVolume, XfsSettings};
use crate::error::{BackendError, CommandError, RegistryError, ReportError};
use crate::registry::{ProjectStore, first_free_id};

use super::command::CommandRunner;
use super::report::{self, QuotaSample, ReportLine};

/// Issues xfs_quota commands against the configured filesystems
#[derive(Debug, Clone)]
pub struct XfsBackend {
    program: String,
    base_args: Vec<String>,
    mounted_filesystems: Vec<String>,
    runner: CommandRunner,
}

impl XfsBackend {
    pub fn new(settings: &XfsSettings) -> Self {
        let mut command = settings.command.iter();
        let program = command
            .next()
            .cloned()
            .unwrap_or_else(|| "xfs_quota".to_string());
        let base_args = command.cloned().collect();

        let mounted_filesystems = settings
            .mounted_filesystems
            .as_deref()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        XfsBackend {
            program,
            base_args,
            mounted_filesystems,
            runner: CommandRunner::new(settings.command_timeout()),
        }
    }

    /// Idempotent quota upsert.
    ///
    /// Registers the path as a new project when it has no id yet, then sets
    /// the hard byte limit either way.
    pub async fn set_quota(
        &self,
        store: &ProjectStore,
        path: &Path,
        bytes: u64,
    ) -> Result<(), BackendError> {
        let projects = store.read_all()?;

        let id = match projects.get(path) {
            Some(id) => {
                info!(
                    "Updating quota on {} (project id {}) to {} bytes",
                    path.display(),
                    id,
                    bytes
                );
                *id
            }
            None => {
                let id = first_free_id(projects.into_values().collect())?;
                info!(
                    "Creating new XFS project {} on {} with {} bytes",
                    id,
                    path.display(),
                    bytes
                );
                store.create(path, id)?;
                self.run_subcommand(format!("project -s {}", id)).await?;
                id
            }
        };

        self.run_subcommand(format!("limit -p bhard={} {}", bytes, id))
            .await?;
        Ok(())
    }

    /// Zero a path's quota, drop its registry entries, then delete the tree
    pub async fn remove_quota(
        &self,
        store: &ProjectStore,
        path: &Path,
    ) -> Result<(), BackendError> {
        info!("Removing {} from XFS project files", path.display());

        let projects = store.read_all()?;
        let id = projects
            .get(path)
            .copied()
            .ok_or_else(|| RegistryError::NotRegistered(path.to_path_buf()))?;

        self.run_subcommand(format!("limit -p bhard=0 {}", id))
            .await?;
        store.remove(path)?;
        fs::remove_dir_all(path)?;
        Ok(())
    }

    /// Query both usage reports and join them into samples.
    ///
    /// Unlike the mutations this propagates failures to the caller.
    pub async fn list_usage(
        &self,
        volumes: &HashMap<String, RootVolume>,
    ) -> Result<Vec<QuotaSample>, ReportError> {
        let byte_lines = self.report("report -Np").await?;
        let file_lines = self.report("report -Ni").await?;
        Ok(report::build_samples(&byte_lines, &file_lines, volumes))
    }

    async fn report(&self, subcommand: &str) -> Result<Vec<ReportLine>, ReportError> {
        let lines = self.run_subcommand(subcommand.to_string()).await?;
        lines.iter().map(|line| ReportLine::parse(line)).collect()
    }

    async fn run_subcommand(&self, subcommand: String) -> Result<Vec<String>, CommandError> {
        let (program, args) = self.invocation(subcommand);
        self.runner.run(&program, &args).await
    }

    /// Assemble one `xfs_quota -xc <subcommand>` invocation
    fn invocation(&self, subcommand: String) -> (String, Vec<String>) {
        let mut args = self.base_args.clone();
        args.push("-xc".to_string());
        args.push(subcommand);
        args.extend(self.mounted_filesystems.iter().cloned());
        (self.program.clone(), args)
    }
}
