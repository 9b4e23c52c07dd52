// src/config.rs

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_INPUT: &str = "PrixCarburants_instantane.xml";
pub const DEFAULT_OUTPUT: &str = "PrixCarburants_instantane.csv";

/// Input/output locations. With no arguments the fixed default file names in
/// the working directory are used.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    author,
    version,
    about = "Flatten the instantaneous fuel price XML feed into a CSV sorted by fuel type"
)]
pub struct Config {
    /// XML document to read
    #[arg(long, env = "PRIX_XML", default_value = DEFAULT_INPUT)]
    pub input: PathBuf,
    /// CSV file to (over)write
    #[arg(long, env = "PRIX_CSV", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}
