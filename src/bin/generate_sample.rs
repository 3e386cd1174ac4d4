//! Writes the two-region sample database in the text layout and parses it
//! back as a check.
//!
//! Usage: `generate_sample [OUT_DIR] [IOT|SUT]`

use std::path::PathBuf;

use anyhow::Context;
use iotables::{parse_from_text, sample, Mode, TableKind, TextOptions};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_data".into()));
    let table: TableKind = args
        .next()
        .unwrap_or_else(|| "IOT".into())
        .to_uppercase()
        .parse()
        .context("table must be IOT or SUT")?;

    sample::write_text_database(&out_dir, table)?;

    let mut opts = TextOptions::new(table, Mode::Flows);
    opts.model.name = Some("sample".into());
    opts.model.calc_all = true;
    let db = parse_from_text(&out_dir, &opts)?;

    println!(
        "Wrote {} ({} table, {} regions, {} matrices) to {}",
        opts.model.name.as_deref().unwrap_or("sample"),
        db.table(),
        db.indices().regions().len(),
        db.matrices("baseline")?.len(),
        out_dir.display()
    );
    Ok(())
}
