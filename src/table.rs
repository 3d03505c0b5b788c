//! Flat persisted tables.
//!
//! Each table is a CSV file with a header row. The schema is whatever columns
//! the file already has; callers look columns up by name (trimmed and
//! case-insensitive) rather than by position.
//!
//! [`TableStore::modify`] is the only way to write. It holds the table's lock
//! across load, mutation and rewrite, and the rewrite goes to a temp file in
//! the same directory that is then renamed over the original, so readers only
//! ever see a complete table and two sessions cannot lose each other's update.

use log::debug;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::error::{DashboardError, Result};

/// In-memory copy of a table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(header: &[&str]) -> Self {
        Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Position of `name` in the header, ignoring case and surrounding spaces.
    /// Unnamed columns are never matched.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.header
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// Like [`Table::column`] but reports a missing column as `NotFound`.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| DashboardError::NotFound(format!("Column '{}' not found.", name)))
    }

    /// Appends a column filled with empty cells and returns its index.
    pub fn add_column(&mut self, name: &str) -> usize {
        let width = self.header.len() + 1;
        self.header.push(name.to_string());
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
        width - 1
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Sets one cell. Only a row that is too short to hold `col` is padded.
    pub fn set_cell(&mut self, row: usize, col: usize, value: &str) {
        if let Some(r) = self.rows.get_mut(row) {
            if r.len() <= col {
                r.resize(col + 1, String::new());
            }
            r[col] = value.to_string();
        }
    }

    /// First row whose `col` equals `value` exactly.
    pub fn find_row(&self, col: usize, value: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|r| r.get(col).map(String::as_str) == Some(value))
    }

    /// Appends a row built from `(column, value)` pairs. Columns the table
    /// does not have yet are added; columns not mentioned are left empty.
    pub fn push_record(&mut self, fields: &[(&str, &str)]) {
        let mut row = vec![String::new(); self.header.len()];
        for (name, value) in fields {
            let col = match self.column(name) {
                Some(col) => col,
                None => {
                    let col = self.add_column(name);
                    row.push(String::new());
                    col
                }
            };
            row[col] = value.to_string();
        }
        self.rows.push(row);
    }

    /// Rows are kept exactly as read, short or long. A row wider than the
    /// header gets unnamed header columns so none of its cells are lost on
    /// the next rewrite.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes);
        let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let row: Vec<String> = record?.iter().map(str::to_string).collect();
            if row.len() > header.len() {
                header.resize(row.len(), String::new());
            }
            rows.push(row);
        }
        Ok(Table { header, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| DashboardError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

/// One table file plus the lock that serializes writers to it.
#[derive(Debug)]
pub struct TableStore {
    path: PathBuf,
    default_header: Vec<String>,
    lock: Mutex<()>,
}

impl TableStore {
    /// `default_header` is only used when the file does not exist yet and a
    /// write creates it.
    pub fn new(path: impl Into<PathBuf>, default_header: &[&str]) -> Self {
        TableStore {
            path: path.into(),
            default_header: default_header.iter().map(|h| h.to_string()).collect(),
            lock: Mutex::new(()),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the whole table. A missing file is `NotFound`.
    pub fn load(&self) -> Result<Table> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_unlocked()
    }

    /// Loads the table (or an empty one with the default header), applies `f`
    /// and rewrites the file, all under the table lock. If `f` fails nothing
    /// is written.
    pub fn modify<T>(&self, f: impl FnOnce(&mut Table) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut table = match self.read_unlocked() {
            Ok(table) => table,
            Err(DashboardError::NotFound(_)) => Table {
                header: self.default_header.clone(),
                rows: Vec::new(),
            },
            Err(e) => return Err(e),
        };
        let out = f(&mut table)?;
        self.write_unlocked(&table)?;
        Ok(out)
    }

    fn read_unlocked(&self) -> Result<Table> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DashboardError::NotFound(format!(
                    "{} does not exist.",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        Table::parse(&bytes)
    }

    fn write_unlocked(&self, table: &Table) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&table.to_csv()?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| DashboardError::Io(e.error))?;
        // Make the rename durable too.
        if let Ok(d) = File::open(&dir) {
            let _ = d.sync_all();
        }
        debug!(
            "rewrote {} ({} rows)",
            self.path.display(),
            table.rows.len()
        );
        Ok(())
    }
}
