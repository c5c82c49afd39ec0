use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::models::{DownloadArtifact, StageId};

const LOCK_FILE: &str = ".javalift.lock";

/// Fixed output paths under a root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Shared layout; every run overwrites the same files
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout private to one run under `runs/<run-id>/`
    pub fn isolated(root: impl AsRef<Path>, run_id: Uuid) -> Self {
        Self {
            root: root.as_ref().join("runs").join(run_id.to_string()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Verbatim copy of the uploaded source
    pub fn legacy_path(&self, name: &str) -> PathBuf {
        self.root.join("legacy_code").join(format!("{}.java", name))
    }

    /// Persisted output of a stage
    pub fn stage_path(&self, stage: StageId) -> PathBuf {
        match stage {
            StageId::Review => self.root.join("docs").join("code_docs_agent1.md"),
            StageId::Validate => self.root.join("docs").join("code_docs_agent2.md"),
            StageId::Refactor => self.root.join("new_code").join("RefactoredCode.java"),
        }
    }

    /// Take the exclusive run lock for this root.
    ///
    /// A lock left behind by a process that no longer exists is taken over.
    pub fn lock(&self) -> Result<RunLock> {
        self.acquire_lock(false)
    }

    /// Take the run lock, removing any existing lock file first
    pub fn force_lock(&self) -> Result<RunLock> {
        self.acquire_lock(true)
    }

    fn acquire_lock(&self, force: bool) -> Result<RunLock> {
        std::fs::create_dir_all(&self.root).map_err(|source| PipelineError::OutputWrite {
            path: self.root.clone(),
            source,
        })?;

        let path = self.root.join(LOCK_FILE);
        match create_lock_file(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = read_lock_holder(&path);
                let stale = holder.is_some_and(|pid| !process_alive(pid));
                if !force && !stale {
                    return Err(PipelineError::RunInProgress(path));
                }

                warn!(
                    "Taking over run lock {:?} (holder {:?}, forced: {})",
                    path, holder, force
                );
                std::fs::remove_file(&path).map_err(|source| PipelineError::OutputWrite {
                    path: path.clone(),
                    source,
                })?;
                create_lock_file(&path).map_err(|source| {
                    if source.kind() == std::io::ErrorKind::AlreadyExists {
                        PipelineError::RunInProgress(path.clone())
                    } else {
                        PipelineError::OutputWrite {
                            path: path.clone(),
                            source,
                        }
                    }
                })
            }
            Err(source) => Err(PipelineError::OutputWrite { path, source }),
        }
    }
}

fn create_lock_file(path: &Path) -> std::io::Result<RunLock> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = writeln!(file, "{}", std::process::id()) {
        warn!("Failed to record pid in run lock {:?}: {}", path, e);
    }
    debug!("Acquired run lock {:?}", path);
    Ok(RunLock {
        path: path.to_path_buf(),
    })
}

/// PID stored in a lock file, if readable
fn read_lock_holder(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Liveness is only known where `/proc` exists; elsewhere the holder counts as alive
fn process_alive(pid: u32) -> bool {
    let proc = Path::new("/proc");
    !proc.is_dir() || proc.join(pid.to_string()).exists()
}

/// Held for the duration of a run; removes the lock file on drop
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove run lock {:?}: {}", self.path, e);
        }
    }
}

/// Write UTF-8 text, creating parent directories and overwriting existing content
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    let to_error = |source| PipelineError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, content).map_err(to_error)?;
    debug!("Wrote {} bytes to {:?}", content.len(), path);
    Ok(())
}

/// Save the download artifact into `dir` under its fixed file name
pub fn export_download(artifact: &DownloadArtifact, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(&artifact.file_name);
    write_text(&path, &artifact.data)?;
    Ok(path)
}
