//! Reference table preprocessing

use crate::error::{Error, Result};
use crate::growth::{read_daily, reduce_to_monthly, write_monthly};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct ReduceStats {
    pub input: PathBuf,
    pub output: PathBuf,
    pub daily_rows: usize,
    pub monthly_rows: usize,
}

/// Collapse a daily `Day,L,M,S` table to one row per 30-day bucket
pub fn cmd_tables_reduce(input: &Path, output: &Path) -> Result<ReduceStats> {
    let reader = File::open(input)
        .map_err(|e| Error::Config(format!("cannot open {}: {}", input.display(), e)))?;
    let daily = read_daily(reader)?;
    let monthly = reduce_to_monthly(&daily)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_monthly(&monthly, BufWriter::new(File::create(output)?))?;
    info!(
        "Reduced {} daily rows to {} monthly rows",
        daily.len(),
        monthly.len()
    );

    Ok(ReduceStats {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        daily_rows: daily.len(),
        monthly_rows: monthly.len(),
    })
}

pub fn print_reduce_stats(stats: &ReduceStats) {
    println!("✓ Wrote {}", stats.output.display());
    println!(
        "  {} daily rows → {} monthly rows",
        stats.daily_rows, stats.monthly_rows
    );
}
