// src/write.rs

use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use std::{
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::model::{Row, COLUMNS};

/// Byte-order mark so spreadsheet tools detect UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `rows` as CSV to `path`, replacing any existing file.
///
/// Rows go to a temporary file next to `path` which is renamed into place
/// once everything is flushed; on error the temporary file is removed and
/// `path` is left as it was.
#[tracing::instrument(level = "info", skip(path, rows), fields(path = %path.as_ref().display(), rows = rows.len()))]
pub fn write_csv<P: AsRef<Path>>(path: P, rows: &[Row<'_>]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // 1) Write everything into a temp file in the destination directory
    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    write_rows(BufWriter::new(tmp.as_file()), rows)
        .with_context(|| format!("Failed to write CSV rows for {:?}", path))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temp file for {:?}", path))?;

    // 2) Rename over the destination
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {:?}", path))?;
    debug!("csv written");
    Ok(())
}

/// BOM, header, then one CRLF-terminated record per row. Fields holding a
/// comma, quote or line break are quoted.
pub fn write_rows<W: Write>(mut out: W, rows: &[Row<'_>]) -> Result<()> {
    out.write_all(UTF8_BOM).context("writing BOM")?;
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_writer(out);
    wtr.write_record(COLUMNS).context("writing CSV header")?;
    for row in rows {
        wtr.serialize(row.to_record())
            .with_context(|| format!("writing row for station {:?}", row.station.id))?;
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}
