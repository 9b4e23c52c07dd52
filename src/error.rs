// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// The input document is not well-formed XML.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML syntax error at byte {position}")]
    Syntax {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("malformed XML at byte {position}: {reason}")]
    Structure { position: usize, reason: String },
}

#[derive(Debug, Error)]
#[error("input file {} does not exist", .path.display())]
pub struct InputMissing {
    pub path: PathBuf,
}

/// How a failed run is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InputMissing,
    Parse,
    General,
}

impl FailureKind {
    /// Walk the context chain looking for one of the typed failures.
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<InputMissing>() {
                return FailureKind::InputMissing;
            }
            if cause.is::<ParseError>() {
                return FailureKind::Parse;
            }
        }
        FailureKind::General
    }
}

/// One-line `a: b: c` rendering of an error chain. A cause whose message the
/// previous link already contains is skipped, so wrapped library errors that
/// repeat their own source print once.
pub fn report(err: &anyhow::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let msg = cause.to_string();
        if parts.last().map_or(false, |prev| prev.contains(&msg)) {
            continue;
        }
        parts.push(msg);
    }
    parts.join(": ")
}
