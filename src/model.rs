// src/model.rs

use serde::Serialize;

/// Column names of the flattened CSV, in output order.
pub const COLUMNS: [&str; 12] = [
    "pdv_id",
    "latitude",
    "longitude",
    "code_postal",
    "pop",
    "adresse",
    "ville",
    "services",
    "prix_nom",
    "prix_id",
    "prix_maj",
    "prix_valeur",
];

/// Conventional fuel names of the price-type ids found in the feed.
pub const FUEL_TYPES: [(i64, &str); 6] = [
    (1, "Gazole"),
    (2, "SP95"),
    (3, "E85"),
    (4, "GPLc"),
    (5, "E10"),
    (6, "SP98"),
];

/// Separator used when joining a station's service labels into one field.
pub const SERVICES_SEPARATOR: &str = "; ";

/// One `<pdv>` point of sale. Every field is the raw source string, empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Station {
    pub id: String,
    pub latitude: String,
    pub longitude: String,
    pub postal_code: String,
    /// `pop` attribute: "R" (route) or "A" (autoroute) in the published feed.
    pub pop: String,
    pub address: String,
    pub city: String,
    /// Service labels in document order.
    pub services: Vec<String>,
    pub prices: Vec<PriceEntry>,
}

impl Station {
    pub fn services_joined(&self) -> String {
        self.services.join(SERVICES_SEPARATOR)
    }
}

/// One `<prix>` quotation nested under a station.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceEntry {
    pub name: String,
    pub id: String,
    pub updated_at: String,
    pub value: String,
}

/// A station paired with one of its prices, or with none when it has no prices.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub station: &'a Station,
    pub price: Option<&'a PriceEntry>,
}

impl<'a> Row<'a> {
    /// Price-type id, empty for placeholder rows.
    pub fn price_id(&self) -> &'a str {
        self.price.map(|p| p.id.as_str()).unwrap_or("")
    }

    pub fn to_record(&self) -> CsvRecord<'a> {
        let (prix_nom, prix_id, prix_maj, prix_valeur) = match self.price {
            Some(p) => (
                p.name.as_str(),
                p.id.as_str(),
                p.updated_at.as_str(),
                p.value.as_str(),
            ),
            None => ("", "", "", ""),
        };
        CsvRecord {
            pdv_id: &self.station.id,
            latitude: &self.station.latitude,
            longitude: &self.station.longitude,
            code_postal: &self.station.postal_code,
            pop: &self.station.pop,
            adresse: &self.station.address,
            ville: &self.station.city,
            services: self.station.services_joined(),
            prix_nom,
            prix_id,
            prix_maj,
            prix_valeur,
        }
    }
}

/// Serialized shape of a row. Field order must match [`COLUMNS`].
#[derive(Debug, Serialize)]
pub struct CsvRecord<'a> {
    pub pdv_id: &'a str,
    pub latitude: &'a str,
    pub longitude: &'a str,
    pub code_postal: &'a str,
    pub pop: &'a str,
    pub adresse: &'a str,
    pub ville: &'a str,
    pub services: String,
    pub prix_nom: &'a str,
    pub prix_id: &'a str,
    pub prix_maj: &'a str,
    pub prix_valeur: &'a str,
}

/// Expand stations into rows: one per price entry, or a single placeholder row
/// for a station without prices.
pub fn flatten(stations: &[Station]) -> Vec<Row<'_>> {
    let mut rows = Vec::with_capacity(stations.iter().map(|s| s.prices.len().max(1)).sum());
    for station in stations {
        if station.prices.is_empty() {
            rows.push(Row {
                station,
                price: None,
            });
        } else {
            rows.extend(station.prices.iter().map(|price| Row {
                station,
                price: Some(price),
            }));
        }
    }
    rows
}
