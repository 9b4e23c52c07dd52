use clap::Parser;
use prixcarbu::{error::report, model::FUEL_TYPES, run, Config, FailureKind, Outcome};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) configure paths ──────────────────────────────────────────
    let config = Config::parse();

    // ─── 3) convert + report ─────────────────────────────────────────
    match run(&config) {
        Ok(Outcome::Written { stations, rows }) => {
            let legend = FUEL_TYPES
                .iter()
                .map(|(id, name)| format!("{}={}", id, name))
                .collect::<Vec<_>>()
                .join(", ");
            println!("[OK] conversion succeeded");
            println!("  XML file: {}", config.input.display());
            println!("  CSV file: {}", config.output.display());
            println!("  stations: {}", stations);
            println!("  rows written: {}", rows);
            println!(
                "  sorted by prix_id ({}, ...), rows without a numeric prix_id last",
                legend
            );
            ExitCode::SUCCESS
        }
        Ok(Outcome::NoData) => {
            println!(
                "[WARNING] no data found in {}; {} not written",
                config.input.display(),
                config.output.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            match FailureKind::classify(&err) {
                FailureKind::InputMissing => {
                    eprintln!("[ERROR] file {} does not exist", config.input.display())
                }
                FailureKind::Parse => eprintln!("[ERROR] XML parse failure: {}", report(&err)),
                FailureKind::General => eprintln!("[ERROR] {}", report(&err)),
            }
            ExitCode::FAILURE
        }
    }
}
