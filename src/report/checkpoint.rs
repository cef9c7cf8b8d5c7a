use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::foundation::error::{EvalError, EvalResult};
use crate::report::sink::ensure_parent_dir;

/// Scenes already written by an earlier, possibly interrupted, run.
///
/// One scene name per line; each completed scene is appended and flushed immediately.
pub struct DoneList {
    path: PathBuf,
    done: BTreeSet<String>,
    out: File,
}

impl DoneList {
    pub fn open(path: &Path) -> EvalResult<Self> {
        let done = match std::fs::read_to_string(path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(EvalError::io(format!(
                    "read checkpoint '{}': {e}",
                    path.display()
                )));
            }
        };

        ensure_parent_dir(path)?;
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EvalError::io(format!("open checkpoint '{}': {e}", path.display())))?;

        Ok(Self {
            path: path.to_path_buf(),
            done,
            out,
        })
    }

    pub fn contains(&self, scene: &str) -> bool {
        self.done.contains(scene)
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub fn mark(&mut self, scene: &str) -> EvalResult<()> {
        if !self.done.insert(scene.to_string()) {
            return Ok(());
        }
        writeln!(self.out, "{scene}")
            .and_then(|_| self.out.flush())
            .map_err(|e| EvalError::io(format!("write checkpoint '{}': {e}", self.path.display())))
    }
}
