// src/convert.rs

use anyhow::Result;
use std::time::Instant;
use tracing::info;

use crate::{
    config::Config,
    error::InputMissing,
    model::flatten,
    parse::parse_stations,
    sort::sort_rows,
    write::write_csv,
};

/// Result of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The CSV was written with this many data rows.
    Written { stations: usize, rows: usize },
    /// The document holds no stations; nothing was written.
    NoData,
}

/// Parse, flatten, sort and write. Nothing is written unless every earlier
/// step succeeded and produced at least one row.
#[tracing::instrument(level = "info", skip(config), fields(input = %config.input.display(), output = %config.output.display()))]
pub fn run(config: &Config) -> Result<Outcome> {
    let start = Instant::now();

    // ─── 1) input must exist before anything else happens ───────────
    if !config.input.exists() {
        return Err(InputMissing {
            path: config.input.clone(),
        }
        .into());
    }

    // ─── 2) parse + flatten + sort ──────────────────────────────────
    let stations = parse_stations(&config.input)?;
    let rows = sort_rows(flatten(&stations));
    if rows.is_empty() {
        info!("no stations in document; output not written");
        return Ok(Outcome::NoData);
    }

    // ─── 3) serialize ───────────────────────────────────────────────
    write_csv(&config.output, &rows)?;
    info!(
        stations = stations.len(),
        rows = rows.len(),
        elapsed = ?start.elapsed(),
        "conversion done"
    );
    Ok(Outcome::Written {
        stations: stations.len(),
        rows: rows.len(),
    })
}
