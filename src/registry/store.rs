//! Project file persistence
//!
//! The kernel quota tooling reads two colon-delimited files: one maps a
//! numeric project id to a directory (`<id>:<path>`), the other maps the
//! directory back to its id (`<path>:<id>`). Both files must always describe
//! the same set of pairs, so every mutation rewrites or appends to both.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::RegistryError;

/// Handle on the projects/projid file pair
#[derive(Debug, Clone)]
pub struct ProjectStore {
    projects_file: PathBuf,
    projid_file: PathBuf,
}

impl ProjectStore {
    pub fn new(projects_file: PathBuf, projid_file: PathBuf) -> Self {
        ProjectStore {
            projects_file,
            projid_file,
        }
    }

    /// Parse both project files into a path-to-id map.
    ///
    /// Missing files count as empty. Blank lines are skipped. The two files
    /// must agree on every pair; a disagreement fails the read so the caller
    /// never acts on one side of a torn registry.
    pub fn read_all(&self) -> Result<BTreeMap<PathBuf, u32>, RegistryError> {
        let projects = self.parse_file(&self.projects_file, parse_projects_line)?;
        let projid = self.parse_file(&self.projid_file, parse_projid_line)?;

        if projects != projid {
            return Err(RegistryError::Inconsistent(describe_difference(
                &projects, &projid,
            )));
        }

        Ok(projects)
    }

    /// Append a new `(path, id)` pair to both files.
    ///
    /// The caller is responsible for checking that `path` has no record yet.
    pub fn create(&self, path: &Path, id: u32) -> Result<(), RegistryError> {
        append_line(&self.projects_file, &format!("{}:{}", id, path.display()))?;
        append_line(&self.projid_file, &format!("{}:{}", path.display(), id))?;
        Ok(())
    }

    /// Rewrite both files without any line whose path field matches `path`.
    ///
    /// Lines that do not parse are kept verbatim; only an exact match on the
    /// parsed path field is filtered, so `/data/a` never removes `/data/ab`.
    pub fn remove(&self, path: &Path) -> Result<(), RegistryError> {
        rewrite_without(&self.projid_file, path, |line| {
            parse_projid_line(line).map(|(p, _)| p)
        })?;
        rewrite_without(&self.projects_file, path, |line| {
            parse_projects_line(line).map(|(p, _)| p)
        })?;
        Ok(())
    }

    fn parse_file<F>(&self, file: &Path, parse: F) -> Result<BTreeMap<PathBuf, u32>, RegistryError>
    where
        F: Fn(&str) -> Option<(PathBuf, u32)>,
    {
        let Some(text) = read_optional(file)? else {
            return Ok(BTreeMap::new());
        };

        let mut entries = BTreeMap::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse(line) {
                Some((path, id)) => {
                    entries.insert(path, id);
                }
                None => {
                    return Err(RegistryError::MalformedLine {
                        file: file.to_path_buf(),
                        line: line.to_string(),
                    });
                }
            }
        }
        Ok(entries)
    }
}

/// Parse a `<id>:<path>` line from the projects file
fn parse_projects_line(line: &str) -> Option<(PathBuf, u32)> {
    let (id, path) = line.split_once(':')?;
    let id = id.trim().parse().ok()?;
    Some((PathBuf::from(path), id))
}

/// Parse a `<path>:<id>` line from the projid file.
///
/// Splits on the last colon so a path containing colons survives.
fn parse_projid_line(line: &str) -> Option<(PathBuf, u32)> {
    let (path, id) = line.rsplit_once(':')?;
    let id = id.trim().parse().ok()?;
    Some((PathBuf::from(path), id))
}

fn read_optional(file: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(file) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn append_line(file: &Path, line: &str) -> Result<(), RegistryError> {
    let mut handle = OpenOptions::new().create(true).append(true).open(file)?;
    writeln!(handle, "{}", line)?;
    Ok(())
}

fn rewrite_without<F>(file: &Path, target: &Path, parse_path: F) -> Result<(), RegistryError>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let Some(text) = read_optional(file)? else {
        return Ok(());
    };

    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| parse_path(line).as_deref() != Some(target))
        .collect();

    let mut output = kept.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    fs::write(file, output)?;
    Ok(())
}

fn describe_difference(
    projects: &BTreeMap<PathBuf, u32>,
    projid: &BTreeMap<PathBuf, u32>,
) -> String {
    for (path, id) in projects {
        match projid.get(path) {
            None => {
                return format!("{} is only present in the projects file", path.display());
            }
            Some(other) if other != id => {
                return format!(
                    "{} has id {} in the projects file but {} in the projid file",
                    path.display(),
                    id,
                    other
                );
            }
            _ => {}
        }
    }
    for path in projid.keys() {
        if !projects.contains_key(path) {
            return format!("{} is only present in the projid file", path.display());
        }
    }
    "entry counts differ".to_string()
}
