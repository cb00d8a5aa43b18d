//! Per-job workspace directories.
//!
//! Each git workflow run clones into its own freshly created directory, so no two jobs
//! ever share a checkout. The directory is owned by a [`Workspace`] guard and removed
//! when the guard is closed or dropped, which covers early returns, `?` propagation and
//! panics unwinding through the workflow.

use std::io;
use std::path::Path;

use tempfile::TempDir;

use crate::types::JobId;

/// Prefix shared by every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "codevox-";

/// A uniquely named temporary directory holding one job's clone.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Creates a new empty workspace under `root`, named after the job.
    ///
    /// The name is `codevox-<job_id>-<random>`; characters outside `[A-Za-z0-9_-]` in the
    /// job ID are replaced so the name is always a single path component.
    pub fn create(root: &Path, job_id: &JobId) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let prefix = format!("{}{}-", WORKSPACE_PREFIX, path_safe(job_id.as_str()));
        let dir = tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?;
        Ok(Workspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the workspace, reporting any failure.
    ///
    /// Dropping the guard also removes the directory but swallows errors.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

fn path_safe(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
