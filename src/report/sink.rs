use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use crate::foundation::error::{EvalError, EvalResult};

/// Append-only CSV table, flushed after every row so a killed run loses at most one row.
///
/// Fields are joined with `,` and never quoted; every cell is a scene name or a number.
pub struct CsvSink {
    path: PathBuf,
    columns: usize,
    out: BufWriter<File>,
    rows: usize,
    /// First-column values of every row in the table, including rows from earlier runs.
    keys: BTreeSet<String>,
}

impl CsvSink {
    /// Truncate `path` and write the header.
    pub fn create(path: &Path, header: &[String]) -> EvalResult<Self> {
        ensure_parent_dir(path)?;
        let f = File::create(path)
            .map_err(|e| EvalError::io(format!("create table '{}': {e}", path.display())))?;
        let mut sink = Self::wrap(path, header.len(), f, BTreeSet::new());
        sink.write_line(header)?;
        Ok(sink)
    }

    /// Continue an existing table, or start one if `path` is missing or empty.
    ///
    /// An existing header must match `header` exactly. Keys of rows already present are
    /// available through [`CsvSink::contains_key`].
    pub fn append(path: &Path, header: &[String]) -> EvalResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(EvalError::io(format!("read '{}': {e}", path.display()))),
        };
        let mut lines = text.lines();
        let Some(line) = lines.next().filter(|l| !l.trim().is_empty()) else {
            return Self::create(path, header);
        };

        let expected = header.join(",");
        if line.trim_end() != expected {
            return Err(EvalError::validation(format!(
                "table '{}' has header '{line}', expected '{expected}'",
                path.display()
            )));
        }
        let keys = lines
            .filter_map(|l| l.split(',').next())
            .filter(|k| !k.is_empty())
            .map(str::to_owned)
            .collect();

        let mut f = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| EvalError::io(format!("open '{}': {e}", path.display())))?;
        // A killed run can leave the last row without its newline.
        if !text.ends_with('\n') {
            f.write_all(b"\n")
                .map_err(|e| EvalError::io(format!("write '{}': {e}", path.display())))?;
        }
        Ok(Self::wrap(path, header.len(), f, keys))
    }

    fn wrap(path: &Path, columns: usize, f: File, keys: BTreeSet<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            columns,
            out: BufWriter::new(f),
            rows: 0,
            keys,
        }
    }

    /// Whether a row with this first-column value has been written to the table.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn write_line(&mut self, fields: &[String]) -> EvalResult<()> {
        writeln!(self.out, "{}", fields.join(","))
            .and_then(|_| self.out.flush())
            .map_err(|e| EvalError::io(format!("write '{}': {e}", self.path.display())))
    }

    /// Write one row and flush it. The field count must match the header and no field may
    /// contain a comma or line break.
    pub fn write_row(&mut self, fields: &[String]) -> EvalResult<()> {
        if fields.len() != self.columns {
            return Err(EvalError::validation(format!(
                "row has {} fields, table '{}' has {} columns",
                fields.len(),
                self.path.display(),
                self.columns
            )));
        }
        if let Some(bad) = fields.iter().find(|f| f.contains([',', '\n', '\r'])) {
            return Err(EvalError::validation(format!(
                "field '{bad}' cannot be written unquoted"
            )));
        }
        self.write_line(fields)?;
        self.rows += 1;
        if let Some(key) = fields.first() {
            self.keys.insert(key.clone());
        }
        Ok(())
    }

    /// Rows written by this sink, not counting rows from earlier runs.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Location of the table on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the table.
    pub fn finish(mut self) -> EvalResult<()> {
        self.out
            .flush()
            .map_err(|e| EvalError::io(format!("flush '{}': {e}", self.path.display())))
    }
}

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> EvalResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            EvalError::io(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Lowercase `nan`/`inf` like the analysis notebooks expect; finite values use the shortest
/// representation that parses back to the same `f64`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/report/sink.rs"]
mod tests;
