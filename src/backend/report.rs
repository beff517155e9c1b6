//! Usage report parsing
//!
//! xfs_quota's `report -Np` and `report -Ni` emit whitespace-delimited rows
//! of `<path> <used> <soft> <hard> ...`. The byte variant counts kilobytes,
//! the inode variant counts files.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::config::RootVolume;
use crate::error::ReportError;

/// One row of an xfs_quota usage report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub path: PathBuf,
    pub used: u64,
    pub hard_limit: u64,
}

impl ReportLine {
    /// Parse a `<path> <used> <soft> <hard> ...` row
    pub fn parse(line: &str) -> Result<Self, ReportError> {
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < 4 {
            return Err(ReportError::TruncatedLine(line.to_string()));
        }

        let used = columns[1].parse().map_err(|_| ReportError::BadNumber {
            line: line.to_string(),
            column: "used",
        })?;
        let hard_limit = columns[3].parse().map_err(|_| ReportError::BadNumber {
            line: line.to_string(),
            column: "hard limit",
        })?;

        Ok(ReportLine {
            path: PathBuf::from(columns[0]),
            used,
            hard_limit,
        })
    }
}

/// Usage and limits for one managed folder, in bytes and file counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSample {
    pub root_volume: String,
    pub relative_path: String,
    pub files_used: u64,
    pub files_quota: u64,
    pub bytes_used: u64,
    pub bytes_quota: u64,
}

/// Join the byte and file reports and resolve each row against the managed
/// root volumes.
///
/// Rows are merged by reported path; a path missing from one report counts
/// as zero on that side. Byte rows arrive in kilobytes and are converted
/// here. Rows under no managed root volume are dropped.
pub fn build_samples(
    byte_lines: &[ReportLine],
    file_lines: &[ReportLine],
    volumes: &HashMap<String, RootVolume>,
) -> Vec<QuotaSample> {
    let mut merged: BTreeMap<&Path, (Option<&ReportLine>, Option<&ReportLine>)> = BTreeMap::new();
    for line in byte_lines {
        merged.entry(line.path.as_path()).or_default().0 = Some(line);
    }
    for line in file_lines {
        merged.entry(line.path.as_path()).or_default().1 = Some(line);
    }

    let mut samples = Vec::new();
    for (path, (bytes, files)) in merged {
        let Some((name, relative)) = longest_matching_volume(path, volumes) else {
            continue;
        };

        let (bytes_used, bytes_quota) = match bytes {
            Some(line) => (line.used * 1024, line.hard_limit * 1024),
            None => (0, 0),
        };
        let (files_used, files_quota) = match files {
            Some(line) => (line.used, line.hard_limit),
            None => (0, 0),
        };

        samples.push(QuotaSample {
            root_volume: name.to_string(),
            relative_path: relative.display().to_string(),
            files_used,
            files_quota,
            bytes_used,
            bytes_quota,
        });
    }
    samples
}

/// Find the root volume whose path is the longest prefix of `path`.
///
/// Prefixes are compared component by component, so `/data/scratch` never
/// claims rows under `/data/scratch2`.
fn longest_matching_volume<'a>(
    path: &Path,
    volumes: &'a HashMap<String, RootVolume>,
) -> Option<(&'a str, PathBuf)> {
    volumes
        .iter()
        .filter_map(|(name, volume)| {
            let root = volume.root_path();
            let relative = path.strip_prefix(root).ok()?;
            Some((name.as_str(), root.components().count(), relative.to_path_buf()))
        })
        .max_by_key(|(_, components, _)| *components)
        .map(|(name, _, relative)| (name, relative))
}
