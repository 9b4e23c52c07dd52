pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod parse;
pub mod sort;
pub mod write;

pub use config::Config;
pub use convert::{run, Outcome};
pub use error::{FailureKind, InputMissing, ParseError};
pub use model::{flatten, PriceEntry, Row, Station};
