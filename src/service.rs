//! Service facade
//!
//! Ties the policy model, mutation worker, and backend together behind the
//! operations the API layer calls.

use serde::Serialize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{QuotaSample, XfsBackend};
use crate::config::Settings;
use crate::error::ServiceError;
use crate::reconcile::{self, Problem};
use crate::registry::{ProjectStore, QuotaWorker};

/// The quota operations exposed to callers
#[derive(Clone)]
pub struct QuotaService {
    settings: Arc<Settings>,
    backend: XfsBackend,
    worker: QuotaWorker,
}

/// Health summary for the service boundary
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub problems: Vec<Problem>,
    pub error: Option<String>,
}

impl QuotaService {
    /// Build the backend and spawn the mutation worker.
    ///
    /// Must run inside a tokio runtime.
    pub fn new(settings: Arc<Settings>) -> Self {
        let store = ProjectStore::new(
            settings.xfs.projects_file.clone(),
            settings.xfs.projid_file.clone(),
        );
        let backend = XfsBackend::new(&settings.xfs);
        let worker = QuotaWorker::spawn(store, backend.clone(), settings.xfs.queue_capacity);

        QuotaService {
            settings,
            backend,
            worker,
        }
    }

    /// Queue a quota upsert for an absolute path. Fire-and-forget: command
    /// failures surface in the log and the next audit, not here.
    pub fn set_quota(&self, path: PathBuf, bytes: u64) -> Result<(), ServiceError> {
        self.worker.submit_set(path, bytes)
    }

    /// Queue a quota removal for an absolute path. Fire-and-forget.
    pub fn remove_quota(&self, path: PathBuf) -> Result<(), ServiceError> {
        self.worker.submit_remove(path)
    }

    /// Snapshot usage for every managed folder
    pub async fn list_usage(&self) -> Result<Vec<QuotaSample>, ServiceError> {
        Ok(self.backend.list_usage(&self.settings.root_volumes).await?)
    }

    /// Queue quota upserts for every managed folder of every root volume
    pub fn apply_all(&self) -> Result<(), ServiceError> {
        reconcile::apply_all(&self.settings, &self.worker)
    }

    /// Audit the managed folders against a fresh usage snapshot
    pub async fn audit(&self) -> Result<Vec<Problem>, ServiceError> {
        let samples = self.list_usage().await?;
        reconcile::audit_volumes(&self.settings, &samples)
    }

    /// Audit shaped for the health boundary: a degraded usage query is
    /// reported in the result instead of propagated.
    pub async fn health(&self) -> HealthReport {
        match self.audit().await {
            Ok(problems) => HealthReport {
                healthy: problems.is_empty(),
                problems,
                error: None,
            },
            Err(e) => HealthReport {
                healthy: false,
                problems: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Create a user volume folder and queue the quotas its policy implies.
    ///
    /// `relative` must be exactly `<user>/<volume>`. The folder is created
    /// world-writable.
    pub fn create_volume(&self, root_volume: &str, relative: &str) -> Result<(), ServiceError> {
        let volume = self
            .settings
            .volume(root_volume)
            .ok_or_else(|| ServiceError::UnknownRootVolume(root_volume.to_string()))?;

        let (user, user_volume) = split_relative(relative)?;
        let user_folder = volume.root_path().join(user);
        let user_volume_folder = user_folder.join(user_volume);

        fs::create_dir_all(&user_volume_folder)?;
        fs::set_permissions(&user_volume_folder, fs::Permissions::from_mode(0o777))?;

        if volume.per_user_quota != 0 {
            self.worker.submit_set(user_folder, volume.per_user_quota)?;
        }
        if volume.per_volume_quota != 0 {
            self.worker
                .submit_set(user_volume_folder, volume.per_volume_quota)?;
        }
        Ok(())
    }

    /// Delete a user volume folder, going through the quota removal path
    /// when the policy put a quota on it.
    pub fn delete_volume(&self, root_volume: &str, relative: &str) -> Result<(), ServiceError> {
        let volume = self
            .settings
            .volume(root_volume)
            .ok_or_else(|| ServiceError::UnknownRootVolume(root_volume.to_string()))?;

        let (user, user_volume) = split_relative(relative)?;
        let user_volume_folder = volume.root_path().join(user).join(user_volume);

        if volume.per_volume_quota != 0 {
            self.worker.submit_remove(user_volume_folder)?;
        } else {
            fs::remove_dir_all(&user_volume_folder)?;
        }
        Ok(())
    }

    /// Wait until every queued mutation has been processed
    pub async fn flush(&self) -> Result<(), ServiceError> {
        self.worker.flush().await
    }
}

/// Split a `<user>/<volume>` relative path into its two segments
fn split_relative(relative: &str) -> Result<(&str, &str), ServiceError> {
    let invalid = || ServiceError::InvalidRelativePath(relative.to_string());

    let (user, user_volume) = relative.split_once('/').ok_or_else(invalid)?;
    if user.is_empty()
        || user_volume.is_empty()
        || user_volume.contains('/')
        || user == "."
        || user == ".."
        || user_volume == "."
        || user_volume == ".."
    {
        return Err(invalid());
    }
    Ok((user, user_volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RootVolume, XfsSettings};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn service(dir: &TempDir, per_user: u64, per_volume: u64) -> QuotaService {
        let settings = Settings {
            root_volumes: HashMap::from([(
                "scratch".to_string(),
                RootVolume {
                    path: dir.path().join("scratch").display().to_string(),
                    per_user_quota: per_user,
                    per_volume_quota: per_volume,
                },
            )]),
            xfs: XfsSettings {
                projects_file: dir.path().join("projects"),
                projid_file: dir.path().join("projid"),
                mounted_filesystems: None,
                command: vec!["true".to_string()],
                command_timeout_secs: 5,
                queue_capacity: 8,
            },
        };
        fs::create_dir_all(dir.path().join("scratch")).unwrap();
        QuotaService::new(Arc::new(settings))
    }

    fn registered_paths(service: &QuotaService) -> Vec<PathBuf> {
        let store = ProjectStore::new(
            service.settings.xfs.projects_file.clone(),
            service.settings.xfs.projid_file.clone(),
        );
        store.read_all().unwrap().into_keys().collect()
    }

    #[tokio::test]
    async fn test_create_volume_queues_the_user_quota() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 1024, 0);

        service.create_volume("scratch", "alice/work").unwrap();
        service.flush().await.unwrap();

        let root = dir.path().join("scratch");
        assert!(root.join("alice/work").is_dir());
        assert_eq!(registered_paths(&service), vec![root.join("alice")]);

        let mode = fs::metadata(root.join("alice/work"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[tokio::test]
    async fn test_create_volume_queues_the_volume_quota() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 0, 4096);

        service.create_volume("scratch", "alice/work").unwrap();
        service.flush().await.unwrap();

        let root = dir.path().join("scratch");
        assert_eq!(registered_paths(&service), vec![root.join("alice/work")]);
    }

    #[tokio::test]
    async fn test_create_volume_rejects_unknown_root_volume() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 1024, 0);

        let result = service.create_volume("persistent", "alice/work");

        assert!(matches!(result, Err(ServiceError::UnknownRootVolume(_))));
    }

    #[tokio::test]
    async fn test_create_volume_rejects_bad_relative_paths() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 1024, 0);

        for relative in ["alice", "alice/work/extra", "../work", "alice/..", "/work"] {
            let result = service.create_volume("scratch", relative);
            assert!(
                matches!(result, Err(ServiceError::InvalidRelativePath(_))),
                "accepted {:?}",
                relative
            );
        }
    }

    #[tokio::test]
    async fn test_delete_volume_without_volume_quota_deletes_directly() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 1024, 0);

        service.create_volume("scratch", "alice/work").unwrap();
        service.flush().await.unwrap();
        service.delete_volume("scratch", "alice/work").unwrap();

        assert!(!dir.path().join("scratch/alice/work").exists());
    }

    #[tokio::test]
    async fn test_delete_volume_with_volume_quota_clears_the_registry() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir, 0, 4096);

        service.create_volume("scratch", "alice/work").unwrap();
        service.flush().await.unwrap();
        service.delete_volume("scratch", "alice/work").unwrap();
        service.flush().await.unwrap();

        assert!(!dir.path().join("scratch/alice/work").exists());
        assert!(registered_paths(&service).is_empty());
    }
}
