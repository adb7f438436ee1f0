//! Reading and writing table files.
//!
//! A table file is plain UTF-8 text, one row per line, fields joined by [`DELIMITER`]. The first
//! line is the header. There is no quoting, so a value must never contain the delimiter or a
//! line break.
//!
//! Every mutation rewrites the whole file. A crash in the middle of [`write_all`] can leave a
//! truncated file behind; nothing here tries to detect or repair that.
//!
//! [`DELIMITER`]: ../schema/constant.DELIMITER.html
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::schema::DELIMITER;

/// creates the file at `path` holding just the `header` row, unless it already exists
///
/// Missing parent directories are created as well.
#[instrument(skip(header))]
pub fn ensure_file(path: &Path, header: &[String]) -> Result<()> {
    if path.exists() {
        debug!("table file already exists");
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?,
    );
    write_row(&mut writer, header)?;
    writer.flush()?;
    debug!("created table file");
    Ok(())
}

/// overwrites the file at `path` with all `rows`, one row per line
pub fn write_all(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        write_row(&mut writer, row)?;
    }
    writer.flush()?;
    debug!(path = ?path, rows = rows.len(), "table file rewritten");
    Ok(())
}

/// returns every line of the file at `path`, without line terminators
pub fn read_all(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let mut line = line?;
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push(line);
    }
    Ok(lines)
}

/// splits one persisted line into its cells
pub fn split_row(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(String::from).collect()
}

fn write_row<W: Write>(writer: &mut W, row: &[String]) -> Result<()> {
    writeln!(writer, "{}", row.join(&DELIMITER.to_string()))?;
    Ok(())
}
