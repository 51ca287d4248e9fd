// crates/arb_cli/src/main.rs
//
// Offline, deterministic CLI entrypoint: load a scenario, run it for its
// configured number of rounds (or an override), and write the round history
// and a scenario summary to the output directory.

mod args;

use std::fs;
use std::process::ExitCode;

use args::{parse_and_validate, Args};

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_and_validate() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("arb: error: {e}");
            return ExitCode::from(1);
        }
    };

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("arb: error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<ExitCode, String> {
    fs::create_dir_all(&args.out).map_err(|e| format!("cannot create output directory {}: {e}", args.out.display()))?;

    let scenario = arb_io::load_scenario_from_path(&args.scenario).map_err(|e| format!("loading scenario: {e}"))?;
    let (mut driver, mut strategy) = scenario.build_driver().map_err(|e| format!("building scenario: {e}"))?;
    let rounds = args.rounds.unwrap_or(scenario.rounds).max(1);

    let mut observer = arb_pipeline::observer::NullObserver;
    let mut last_report = None;
    for round in 1..=rounds {
        log::info!("running round {round} of {rounds}");
        let report = driver
            .run_arbitration_with_earning(&mut strategy, &mut observer, scenario.earning_rate)
            .map_err(|e| format!("round {round} failed: {e}"))?;
        last_report = Some(report);
    }
    let last_report = last_report.ok_or_else(|| "scenario configured for zero rounds".to_string())?;

    let history = driver.tracker().history();
    let csv_path = args.out.join("history.csv");
    arb_io::write_snapshots_csv(history, &csv_path).map_err(|e| format!("writing csv: {e}"))?;

    let final_agents: Vec<arb_core::Agent> = driver.agents().cloned().collect();
    let gini = arb_pipeline::gini_coefficient(&final_agents);
    let summary = arb_report::build_summary(history, last_report.optimal, last_report.violations.len(), gini);
    let summary_json = arb_report::render_json(&summary).map_err(|e| format!("rendering summary: {e}"))?;
    let summary_path = args.out.join("summary.json");
    fs::write(&summary_path, summary_json).map_err(|e| format!("writing summary: {e}"))?;

    if !args.quiet {
        println!("arb: completed {rounds} round(s)");
        println!("arb: pareto_optimal_final_round={}", last_report.optimal);
        println!("arb: history written to {}", csv_path.display());
        println!("arb: summary written to {}", summary_path.display());
    }

    Ok(ExitCode::SUCCESS)
}
