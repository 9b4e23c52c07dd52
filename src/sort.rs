// src/sort.rs

use tracing::debug;

use crate::model::{Row, Station};

/// Primary sort key of a row. Variant order matters: every numeric id sorts
/// before `Unranked`, which collects empty and non-integer ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PriceTypeKey {
    Numeric(i64),
    Unranked,
}

impl PriceTypeKey {
    pub fn from_id(id: &str) -> Self {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return PriceTypeKey::Unranked;
        }
        match trimmed.parse::<i64>() {
            Ok(n) => PriceTypeKey::Numeric(n),
            Err(_) => {
                debug!(id, "non-numeric price id sorted last");
                PriceTypeKey::Unranked
            }
        }
    }
}

/// Order rows by price-type key, then station id as a string. The sort is
/// stable and each key is computed once.
pub fn sort_rows(mut rows: Vec<Row<'_>>) -> Vec<Row<'_>> {
    rows.sort_by_cached_key(|row| {
        let station: &Station = row.station;
        (PriceTypeKey::from_id(row.price_id()), station.id.as_str())
    });
    rows
}
