//! Apply mode
//!
//! Pushes the policy-implied quota of every managed folder to the backend.

use log::info;

use crate::config::Settings;
use crate::error::ServiceError;
use crate::registry::QuotaWorker;

use super::walk::volume_folders;

/// Queue a quota upsert for every managed folder of every root volume.
///
/// Root volumes whose directory does not exist are skipped silently. Folders
/// whose depth carries no quota policy are left alone. Each folder is
/// evaluated on its own, so traversal order does not matter.
pub fn apply_all(settings: &Settings, worker: &QuotaWorker) -> Result<(), ServiceError> {
    info!("[Re-]applying quotas");

    for volume in settings.root_volumes.values() {
        let root = volume.root_path();
        if !root.is_dir() {
            continue;
        }

        for folder in volume_folders(root)? {
            let quota = match folder.depth {
                1 => volume.per_user_quota,
                2 => volume.per_volume_quota,
                _ => 0,
            };
            if quota > 0 {
                worker.submit_set(folder.path, quota)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::XfsBackend;
    use crate::config::{RootVolume, XfsSettings};
    use crate::registry::ProjectStore;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn settings_with_volume(dir: &TempDir, volume: RootVolume) -> Settings {
        Settings {
            root_volumes: HashMap::from([("scratch".to_string(), volume)]),
            xfs: XfsSettings {
                projects_file: dir.path().join("projects"),
                projid_file: dir.path().join("projid"),
                mounted_filesystems: None,
                command: vec!["true".to_string()],
                command_timeout_secs: 5,
                queue_capacity: 8,
            },
        }
    }

    fn worker_for(settings: &Settings) -> (QuotaWorker, ProjectStore) {
        let store = ProjectStore::new(
            settings.xfs.projects_file.clone(),
            settings.xfs.projid_file.clone(),
        );
        let worker = QuotaWorker::spawn(
            store.clone(),
            XfsBackend::new(&settings.xfs),
            settings.xfs.queue_capacity,
        );
        (worker, store)
    }

    #[tokio::test]
    async fn test_per_user_policy_targets_depth_one_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("scratch");
        fs::create_dir_all(root.join("alice/work")).unwrap();

        let settings = settings_with_volume(
            &dir,
            RootVolume {
                path: root.display().to_string(),
                per_user_quota: 1_073_741_824,
                per_volume_quota: 0,
            },
        );
        let (worker, store) = worker_for(&settings);

        apply_all(&settings, &worker).unwrap();
        worker.flush().await.unwrap();

        let entries = store.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&root.join("alice")));
    }

    #[tokio::test]
    async fn test_per_volume_policy_targets_depth_two_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("scratch");
        fs::create_dir_all(root.join("alice/work")).unwrap();

        let settings = settings_with_volume(
            &dir,
            RootVolume {
                path: root.display().to_string(),
                per_user_quota: 0,
                per_volume_quota: 4096,
            },
        );
        let (worker, store) = worker_for(&settings);

        apply_all(&settings, &worker).unwrap();
        worker.flush().await.unwrap();

        let entries = store.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&root.join("alice/work")));
    }

    #[tokio::test]
    async fn test_missing_root_volume_is_skipped() {
        let dir = TempDir::new().unwrap();
        let settings = settings_with_volume(
            &dir,
            RootVolume {
                path: dir.path().join("missing").display().to_string(),
                per_user_quota: 1024,
                per_volume_quota: 0,
            },
        );
        let (worker, store) = worker_for(&settings);

        apply_all(&settings, &worker).unwrap();
        worker.flush().await.unwrap();

        assert!(store.read_all().unwrap().is_empty());
    }
}
