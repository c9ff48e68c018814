//! Flat-file serialization.
//!
//! Every export file is a sequence of `^`-joined, `\n`-terminated lines.
//! Nulls render as empty fields so column positions never shift.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Statement};
use tracing::warn;

use crate::error::{ExportError, Result};
use crate::utils::fs::ensure_dir;

/// Field delimiter used by every client file.
pub const DELIMITER: &str = "^";

/// Buffered writer over a truncated output file.
pub struct FlatFileWriter {
    path: PathBuf,
    out: BufWriter<File>,
    rows: usize,
    header_len: u64,
}

impl FlatFileWriter {
    /// Create (or truncate) the output file, creating its directory if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let opened = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                ensure_dir(parent).and_then(|()| Ok(File::create(&path)?))
            }
            _ => File::create(&path).map_err(ExportError::from),
        };
        let file = opened.map_err(|err| ExportError::OutputUnavailable {
            path: path.clone(),
            source: match err {
                ExportError::Io(source) => source,
                other => std::io::Error::other(other.to_string()),
            },
        })?;

        Ok(Self {
            path,
            out: BufWriter::new(file),
            rows: 0,
            header_len: 0,
        })
    }

    /// Write a line that is not a data row (file header). Headers must come
    /// before any data row.
    pub fn write_header(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        self.header_len += line.len() as u64 + 1;
        Ok(())
    }

    /// Write one data row from already-rendered fields.
    pub fn write_fields<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        writeln!(self.out, "{}", fields.into_iter().join(DELIMITER))?;
        self.rows += 1;
        Ok(())
    }

    /// Write one data row that formats itself.
    pub fn write_row(&mut self, row: &impl std::fmt::Display) -> Result<()> {
        writeln!(self.out, "{row}")?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close, returning the number of data rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush()?;
        Ok(self.rows)
    }

    /// Drop every data row written so far, keeping only the header.
    pub fn discard(mut self) -> Result<()> {
        self.out.flush()?;
        self.out.get_ref().set_len(self.header_len)?;
        Ok(())
    }
}

/// Create `path` and let `fill` write it.
///
/// When `fill` fails the data rows already written are discarded, so a failed
/// export never leaves a partial file behind.
pub fn write_file<F>(path: &Path, fill: F) -> Result<usize>
where
    F: FnOnce(&mut FlatFileWriter) -> Result<()>,
{
    let mut out = FlatFileWriter::create(path)?;
    match fill(&mut out) {
        Ok(()) => out.finish(),
        Err(err) => {
            let path = out.path.clone();
            if let Err(discard_err) = out.discard() {
                warn!(
                    path = %path.display(),
                    error = %discard_err,
                    "unable to discard partial export"
                );
            }
            Err(err)
        }
    }
}

/// Render a column value the way the client expects it.
pub fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Stream every row of a prepared statement into `out`, in result order.
///
/// `transform` sees each row's rendered fields before they are written and may
/// rewrite values in place; it cannot add or remove fields.
pub fn write_statement<F>(stmt: &mut Statement<'_>, out: &mut FlatFileWriter, mut transform: F) -> Result<()>
where
    F: FnMut(&mut [String]),
{
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;
    let mut fields: Vec<String> = Vec::with_capacity(columns);

    while let Some(row) = rows.next()? {
        fields.clear();
        for index in 0..columns {
            fields.push(render_value(row.get_ref(index)?));
        }
        transform(&mut fields);
        out.write_fields(&fields)?;
    }
    Ok(())
}

/// Stream the result of `sql` into `out` unchanged.
pub fn write_query(conn: &Connection, sql: &str, out: &mut FlatFileWriter) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    write_statement(&mut stmt, out, |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sample (id INTEGER, name TEXT, ratio REAL, extra TEXT);
             INSERT INTO sample VALUES (2, 'second', 0.5, NULL);
             INSERT INTO sample VALUES (1, NULL, NULL, 'x');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(ValueRef::Null), "");
        assert_eq!(render_value(ValueRef::Integer(-12)), "-12");
        assert_eq!(render_value(ValueRef::Real(1.25)), "1.25");
        assert_eq!(render_value(ValueRef::Text(b"Fire Bolt")), "Fire Bolt");
    }

    #[test]
    fn test_write_query_preserves_order_and_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let conn = sample_db();

        let mut out = FlatFileWriter::create(&path).unwrap();
        write_query(&conn, "SELECT * FROM sample ORDER BY id", &mut out).unwrap();
        assert_eq!(out.finish().unwrap(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1^^^x\n2^second^0.5^\n");
    }

    #[test]
    fn test_transform_rewrites_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let conn = sample_db();

        let mut out = FlatFileWriter::create(&path).unwrap();
        let mut stmt = conn.prepare("SELECT id, name FROM sample ORDER BY id").unwrap();
        write_statement(&mut stmt, &mut out, |fields| fields[0].push('!')).unwrap();
        out.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1!^\n2!^second\n");
    }

    #[test]
    fn test_create_truncates_and_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export/out.txt");

        let mut out = FlatFileWriter::create(&path).unwrap();
        out.write_header("Header").unwrap();
        out.write_fields(["a", "b"]).unwrap();
        assert_eq!(out.finish().unwrap(), 1);

        let out = FlatFileWriter::create(&path).unwrap();
        assert_eq!(out.finish().unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_failed_fill_leaves_only_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let conn = sample_db();

        let err = write_file(&path, |out| {
            out.write_header("Header")?;
            write_query(&conn, "SELECT * FROM sample ORDER BY id", out)?;
            write_query(&conn, "SELECT * FROM missing_table", out)
        })
        .unwrap_err();

        assert!(matches!(err, ExportError::Database(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Header\n");
    }

    #[test]
    fn test_failed_fill_mid_stream_leaves_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "stale contents\n").unwrap();

        let mut seen = 0;
        let err = write_file(&path, |out| {
            for row in ["a", "b", "c"] {
                seen += 1;
                if seen == 3 {
                    return Err(ExportError::Io(std::io::Error::other("row step failed")));
                }
                out.write_fields([row])?;
            }
            Ok(())
        })
        .unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_write_file_counts_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let conn = sample_db();

        let rows = write_file(&path, |out| write_query(&conn, "SELECT id FROM sample", out)).unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_create_reports_unavailable_output() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("export");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = FlatFileWriter::create(blocker.join("out.txt")).err().unwrap();
        assert!(matches!(err, ExportError::OutputUnavailable { .. }));
    }
}
