//! Background namespace wipes.
//!
//! Removing a large directory tree synchronously would stall the caller for
//! as long as the filesystem takes. A wipe instead runs on a detached worker
//! thread that empties the namespace directory and then removes it. The
//! caller gets a [`WipeHandle`] it may join or simply drop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// How a namespace directory is emptied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WipeStrategy {
    /// Remove every entry in-process on the worker thread.
    #[default]
    Recursive,
    /// Mirror an empty staging directory onto the namespace with `rsync`.
    Mirror,
}

impl std::fmt::Display for WipeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recursive => write!(f, "recursive"),
            Self::Mirror => write!(f, "mirror"),
        }
    }
}

impl std::str::FromStr for WipeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recursive" => Ok(Self::Recursive),
            "mirror" => Ok(Self::Mirror),
            other => Err(format!("unknown wipe strategy: {other}")),
        }
    }
}

/// Configuration for namespace wipes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WipeConfig {
    pub strategy: WipeStrategy,
    /// Permanently empty directory used as the mirror source. Must live
    /// outside the store root.
    pub staging_dir: PathBuf,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            strategy: WipeStrategy::default(),
            staging_dir: std::env::temp_dir().join("nbs.empty.d"),
        }
    }
}

impl WipeConfig {
    /// Create the staging directory if the strategy needs one and make sure
    /// it is empty.
    pub(crate) fn prepare(&self, root: &Path) -> StoreResult<()> {
        if self.strategy != WipeStrategy::Mirror {
            return Ok(());
        }
        let unusable = |reason: String| StoreError::UnusableStaging {
            path: self.staging_dir.clone(),
            reason,
        };
        if self.staging_dir.starts_with(root) {
            return Err(unusable("must not be inside the store root".into()));
        }
        fs::create_dir_all(&self.staging_dir).map_err(|e| unusable(e.to_string()))?;
        let mut entries = fs::read_dir(&self.staging_dir).map_err(|e| unusable(e.to_string()))?;
        if entries.next().is_some() {
            return Err(unusable("must be empty".into()));
        }
        Ok(())
    }
}

/// Handle to a running (or finished) namespace wipe.
#[derive(Debug)]
pub struct WipeHandle {
    dir: PathBuf,
    worker: Option<thread::JoinHandle<io::Result<()>>>,
}

impl WipeHandle {
    /// A wipe that already completed synchronously.
    pub fn finished(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), worker: None }
    }

    /// Directory being wiped.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Block until the worker has removed the directory.
    pub fn join(mut self) -> StoreResult<()> {
        match self.worker.take() {
            Some(worker) => match worker.join() {
                Ok(result) => result.map_err(StoreError::from),
                Err(_) => Err(StoreError::WipePanicked(self.dir.clone())),
            },
            None => Ok(()),
        }
    }
}

/// Start a detached wipe of `dir` and immediately try to remove it.
///
/// The immediate `remove_dir` only succeeds if the directory is already
/// empty; otherwise it fails with "directory not empty" and the worker
/// removes the directory once it has emptied it.
pub(crate) fn spawn_wipe(dir: PathBuf, config: &WipeConfig) -> StoreResult<WipeHandle> {
    let worker_dir = dir.clone();
    let strategy = config.strategy;
    let staging = config.staging_dir.clone();

    let worker = thread::Builder::new()
        .name("nbs-wipe".into())
        .spawn(move || run_wipe(&worker_dir, strategy, &staging))?;

    match fs::remove_dir(&dir) {
        Ok(()) => debug!(dir = %dir.display(), "namespace directory removed immediately"),
        Err(e) => debug!(dir = %dir.display(), error = %e, "immediate removal skipped; worker will finish"),
    }

    Ok(WipeHandle { dir, worker: Some(worker) })
}

fn run_wipe(dir: &Path, strategy: WipeStrategy, staging: &Path) -> io::Result<()> {
    let emptied = match strategy {
        WipeStrategy::Recursive => empty_dir(dir),
        WipeStrategy::Mirror => match mirror_empty(staging, dir) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "mirror wipe failed; falling back to recursive");
                empty_dir(dir)
            }
        },
    };
    let result = emptied.and_then(|()| ignore_not_found(fs::remove_dir(dir)));
    match &result {
        Ok(()) => debug!(dir = %dir.display(), %strategy, "namespace wiped"),
        Err(e) => warn!(dir = %dir.display(), error = %e, "namespace wipe failed"),
    }
    result
}

/// Remove every entry inside `dir`, leaving `dir` itself in place.
fn empty_dir(dir: &Path) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            ignore_not_found(fs::remove_dir_all(&path))?;
        } else {
            ignore_not_found(fs::remove_file(&path))?;
        }
    }
    Ok(())
}

fn mirror_empty(staging: &Path, dir: &Path) -> io::Result<()> {
    let status = Command::new("rsync")
        .arg("--archive")
        .arg("--recursive")
        .arg("--delete")
        .arg(format!("{}/", staging.display()))
        .arg(format!("{}/", dir.display()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("rsync exited with {status}")))
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_dir(root: &Path) -> PathBuf {
        let dir = root.join("ns");
        fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        fs::write(dir.join("a"), b"1").unwrap();
        fs::write(dir.join("nested/b"), b"2").unwrap();
        fs::write(dir.join("nested/deeper/c"), b"3").unwrap();
        dir
    }

    #[test]
    fn recursive_wipe_removes_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = populated_dir(tmp.path());
        let handle = spawn_wipe(dir.clone(), &WipeConfig::default()).unwrap();
        assert_eq!(handle.dir(), dir.as_path());
        handle.join().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn empty_directory_is_removed_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("empty");
        fs::create_dir(&dir).unwrap();
        let handle = spawn_wipe(dir.clone(), &WipeConfig::default()).unwrap();
        handle.join().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn missing_directory_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run_wipe(&tmp.path().join("gone"), WipeStrategy::Recursive, tmp.path()).is_ok());
    }

    #[test]
    fn mirror_wipe_removes_tree_with_or_without_rsync() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let config = WipeConfig {
            strategy: WipeStrategy::Mirror,
            staging_dir: tmp.path().join("staging"),
        };
        config.prepare(&root).unwrap();
        let dir = populated_dir(&root);
        spawn_wipe(dir.clone(), &config).unwrap().join().unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn staging_inside_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WipeConfig {
            strategy: WipeStrategy::Mirror,
            staging_dir: tmp.path().join("inside"),
        };
        let err = config.prepare(tmp.path()).unwrap_err();
        assert!(matches!(err, StoreError::UnusableStaging { .. }));
    }

    #[test]
    fn non_empty_staging_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = tmp.path().join("staging");
        fs::create_dir(&staging).unwrap();
        fs::write(staging.join("stray"), b"x").unwrap();
        let config = WipeConfig { strategy: WipeStrategy::Mirror, staging_dir: staging };
        let err = config.prepare(&tmp.path().join("root")).unwrap_err();
        assert!(err.to_string().contains("must be empty"));
    }

    #[test]
    fn recursive_strategy_needs_no_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WipeConfig {
            strategy: WipeStrategy::Recursive,
            staging_dir: tmp.path().join("never-created"),
        };
        config.prepare(tmp.path()).unwrap();
        assert!(!config.staging_dir.exists());
    }

    #[test]
    fn strategy_parse_and_display() {
        assert_eq!("mirror".parse::<WipeStrategy>().unwrap(), WipeStrategy::Mirror);
        assert_eq!("recursive".parse::<WipeStrategy>().unwrap(), WipeStrategy::Recursive);
        assert!("rm".parse::<WipeStrategy>().is_err());
        assert_eq!(WipeStrategy::Mirror.to_string(), "mirror");
    }

    #[test]
    fn finished_handle_joins_ok() {
        WipeHandle::finished("/nowhere").join().unwrap();
    }
}
