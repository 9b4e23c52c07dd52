use anyhow::Result;
use std::{
    fs,
    path::Path,
    process::{Command, Output},
};
use tempfile::tempdir;

const INPUT: &str = "PrixCarburants_instantane.xml";
const OUTPUT: &str = "PrixCarburants_instantane.csv";
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Run the binary in `dir` with its default paths.
fn run_in(dir: &Path) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_prixcarbu"))
        .current_dir(dir)
        .env_remove("PRIX_XML")
        .env_remove("PRIX_CSV")
        .env("RUST_LOG", "warn")
        .output()?)
}

/// Data lines of the CSV, header excluded, split into fields.
fn records(dir: &Path) -> Result<Vec<Vec<String>>> {
    let bytes = fs::read(dir.join(OUTPUT))?;
    assert!(bytes.starts_with(BOM), "missing BOM");
    let mut rdr = csv::Reader::from_reader(&bytes[BOM.len()..]);
    let mut out = Vec::new();
    for rec in rdr.records() {
        out.push(rec?.iter().map(str::to_string).collect());
    }
    Ok(out)
}

#[test]
fn scenario_a_prices_of_one_station_in_id_order() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join(INPUT),
        r#"<?xml version="1.0" encoding="UTF-8"?>
<pdv_liste>
  <pdv id="1000001" latitude="4620114" longitude="519791" cp="01000" pop="R">
    <adresse>596 AVENUE DE TREVOUX</adresse>
    <ville>SAINT-DENIS-LèS-BOURG</ville>
    <prix nom="SP95" id="2" maj="2025-01-02 08:01:00" valeur="1.799"/>
    <prix nom="Gazole" id="1" maj="2025-01-02 08:01:00" valeur="1.689"/>
    <prix nom="SP98" id="6" maj="2025-01-02 08:01:00" valeur="1.859"/>
  </pdv>
</pdv_liste>"#,
    )?;

    let out = run_in(dir.path())?;
    assert!(out.status.success(), "{:?}", out);
    let recs = records(dir.path())?;
    let ids: Vec<_> = recs.iter().map(|r| r[9].as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "6"]);
    assert_eq!(recs[0][8], "Gazole");
    assert_eq!(recs[0][6], "SAINT-DENIS-LèS-BOURG");
    Ok(())
}

#[test]
fn scenario_b_station_without_prices() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join(INPUT),
        r#"<pdv_liste>
  <pdv id="42" latitude="4621842" longitude="522767" cp="01000" pop="A">
    <adresse>16 Avenue de Marboz</adresse>
    <ville>BOURG-EN-BRESSE</ville>
    <services><service>Laverie</service><service>Boutique alimentaire</service></services>
  </pdv>
</pdv_liste>"#,
    )?;

    let out = run_in(dir.path())?;
    assert!(out.status.success());
    let recs = records(dir.path())?;
    assert_eq!(recs.len(), 1);
    assert_eq!(
        recs[0],
        vec![
            "42",
            "4621842",
            "522767",
            "01000",
            "A",
            "16 Avenue de Marboz",
            "BOURG-EN-BRESSE",
            "Laverie; Boutique alimentaire",
            "",
            "",
            "",
            ""
        ]
    );
    Ok(())
}

#[test]
fn scenario_c_non_numeric_id_joins_trailing_group() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join(INPUT),
        r#"<pdv_liste>
  <pdv id="3"><prix nom="Mystery" id="abc" valeur="1.0"/><prix nom="E85" id="3" valeur="0.899"/></pdv>
  <pdv id="1"/>
  <pdv id="2"><prix nom="E10" id="5" valeur="1.749"/></pdv>
</pdv_liste>"#,
    )?;

    let out = run_in(dir.path())?;
    assert!(out.status.success());
    let keys: Vec<(String, String)> = records(dir.path())?
        .into_iter()
        .map(|r| (r[9].clone(), r[0].clone()))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("3".to_string(), "3".to_string()),
            ("5".to_string(), "2".to_string()),
            ("".to_string(), "1".to_string()),
            ("abc".to_string(), "3".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn scenario_d_no_stations_exits_zero_without_output() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join(INPUT), "<pdv_liste></pdv_liste>")?;
    let out = run_in(dir.path())?;
    assert!(out.status.success());
    assert!(!dir.path().join(OUTPUT).exists());
    Ok(())
}

#[test]
fn scenario_e_missing_input_fails_and_leaves_output_alone() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join(OUTPUT), "previous run")?;
    let out = run_in(dir.path())?;
    assert!(!out.status.success());
    assert_eq!(fs::read_to_string(dir.path().join(OUTPUT))?, "previous run");

    let empty = tempdir()?;
    let out = run_in(empty.path())?;
    assert!(!out.status.success());
    assert!(!empty.path().join(OUTPUT).exists());
    Ok(())
}

#[test]
fn malformed_xml_fails_without_output() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join(INPUT), "<pdv_liste><pdv id=\"1\">")?;
    let out = run_in(dir.path())?;
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("XML parse failure"));
    assert!(!dir.path().join(OUTPUT).exists());
    Ok(())
}

#[test]
fn rerun_is_byte_identical() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join(INPUT),
        r#"<pdv_liste>
  <pdv id="b"><prix id="2"/><prix id="1"/></pdv>
  <pdv id="a"><adresse>1, "quoted" road</adresse><prix id="2"/></pdv>
</pdv_liste>"#,
    )?;
    assert!(run_in(dir.path())?.status.success());
    let first = fs::read(dir.path().join(OUTPUT))?;
    assert!(run_in(dir.path())?.status.success());
    let second = fs::read(dir.path().join(OUTPUT))?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn explicit_paths_override_defaults() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("feed.xml");
    let output = dir.path().join("flat.csv");
    fs::write(&input, r#"<pdv_liste><pdv id="1"/></pdv_liste>"#)?;
    let out = Command::new(env!("CARGO_BIN_EXE_prixcarbu"))
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .output()?;
    assert!(out.status.success());
    assert!(output.exists());
    assert!(!dir.path().join(OUTPUT).exists());
    Ok(())
}
