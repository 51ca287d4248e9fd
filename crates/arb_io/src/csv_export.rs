//! CSV export of round history (§4.8), one row per agent per round, for
//! downstream analysis in a spreadsheet or notebook.

use std::path::Path;

use arb_pipeline::RoundSnapshot;

use crate::IoResult;

/// Column order is stable and deliberate: identity, then what the round
/// produced (allocation, utility), then the economy inputs that produced it,
/// then the derived satisfaction figures.
const HEADER: &[&str] = &[
    "round",
    "agent_id",
    "strategy",
    "allocation",
    "utility",
    "currency_before",
    "currency_burned",
    "currency_after",
    "satisfaction",
    "cumulative_utility",
];

fn allocation_cell(snapshot: &RoundSnapshot) -> String {
    snapshot
        .allocation
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Render a decimal quantity to 4 significant fractional digits, trimming
/// trailing zeros down to a minimum of 2 (e.g. `1` -> `"1.00"`, `1.23456` ->
/// `"1.2346"`).
fn decimal_cell(value: f64) -> String {
    let formatted = format!("{value:.4}");
    let (int_part, frac_part) = formatted.split_once('.').expect("fixed-precision format always has a point");
    let mut frac = frac_part.trim_end_matches('0').to_string();
    while frac.len() < 2 {
        frac.push('0');
    }
    format!("{int_part}.{frac}")
}

/// Write every recorded snapshot to `path`, sorted by round then agent id
/// (the order `RoundTracker::history` already stores them in).
pub fn write_snapshots_csv(snapshots: &[RoundSnapshot], path: impl AsRef<Path>) -> IoResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(HEADER)?;
    for snapshot in snapshots {
        writer.write_record(&[
            snapshot.round.to_string(),
            snapshot.agent_id.to_string(),
            snapshot.strategy.clone(),
            allocation_cell(snapshot),
            decimal_cell(snapshot.utility),
            snapshot.currency_before.to_string(),
            snapshot.currency_burned.to_string(),
            snapshot.currency_after.to_string(),
            decimal_cell(snapshot.satisfaction),
            decimal_cell(snapshot.cumulative_utility),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
