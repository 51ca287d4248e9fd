//! Scenario definition (§8): a resource pool, a roster of agents, a round
//! count, and a burn strategy, all loaded from a single JSON file.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use arb_core::agent::Agent;
use arb_core::ids::AgentId;
use arb_core::resource::ResourceKind;
use arb_core::utility::UtilityForm;
use arb_pipeline::{BurnStrategy, RoundDriver};

use crate::{IoError, IoResult};

/// One agent's static definition, as it appears in a scenario file. Mirrors
/// `arb_core::agent::Agent`'s own fields so there is nothing to translate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub name: String,
    pub preferences: UtilityForm,
    #[serde(default)]
    pub min_request: BTreeMap<ResourceKind, u64>,
    pub ideal_request: BTreeMap<ResourceKind, u64>,
    #[serde(default)]
    pub balance: Decimal,
}

/// A pre-configured, serializable burn strategy — the scenario-file
/// counterpart of `arb_pipeline::BurnStrategy`, since a trait object can't be
/// deserialized directly.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConfiguredStrategy {
    /// Never burns; every agent keeps `BASE_WEIGHT`.
    Zero,
    /// Every agent burns the same fixed amount every round, floored by its
    /// own remaining balance (§4.4 clamping still applies).
    Constant { amount: Decimal },
    /// Burns `schedule[round - 1]` for every agent; rounds past the end of
    /// the schedule repeat its last entry.
    Schedule { schedule: Vec<Decimal> },
}

impl BurnStrategy for ConfiguredStrategy {
    fn decide_burn(&mut self, _agent: &Agent, round: u64, _contention_ratio: f64) -> Decimal {
        match self {
            ConfiguredStrategy::Zero => Decimal::ZERO,
            ConfiguredStrategy::Constant { amount } => *amount,
            ConfiguredStrategy::Schedule { schedule } => {
                if schedule.is_empty() {
                    return Decimal::ZERO;
                }
                let idx = (round.saturating_sub(1) as usize).min(schedule.len() - 1);
                schedule[idx]
            }
        }
    }
}

/// A full scenario: the resource pool's capacity, the agent roster, how many
/// rounds to run, and the burn strategy to drive them with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub capacity: BTreeMap<ResourceKind, u64>,
    pub agents: Vec<AgentSpec>,
    pub rounds: u64,
    pub strategy: ConfiguredStrategy,
    /// Multiplier credited back onto an agent's balance per unit allocated
    /// each round (§4.6 step 5). Omitted or absent means no earning.
    #[serde(default)]
    pub earning_rate: Option<f64>,
}

impl Scenario {
    /// Build a fresh `RoundDriver` with every agent registered, and the
    /// configured strategy ready to hand to `run_arbitration`. Consumes
    /// `self`'s strategy so the caller owns it directly.
    pub fn build_driver(&self) -> IoResult<(RoundDriver, ConfiguredStrategy)> {
        let mut driver = RoundDriver::new(self.capacity.clone());
        for spec in &self.agents {
            let id = AgentId::new(spec.id.clone())?;
            let agent = Agent::new(
                id,
                spec.name.clone(),
                spec.preferences.clone(),
                spec.min_request.clone(),
                spec.ideal_request.clone(),
                spec.balance,
            )?;
            driver.register(agent)?;
        }
        Ok((driver, self.strategy.clone()))
    }
}

/// Read and parse a scenario from a JSON file at `path`. Agent and pool
/// invariants are enforced by `Scenario::build_driver`, not here — this
/// function only does the file read and JSON parse.
pub fn load_scenario_from_path(path: impl AsRef<Path>) -> IoResult<Scenario> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let scenario: Scenario = serde_json::from_slice(&bytes)?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "capacity": {"COMPUTE": 100},
            "agents": [
                {
                    "id": "a",
                    "name": "Alpha",
                    "preferences": {"kind": "Linear", "weights": {"COMPUTE": 1.0}, "offset": 0.0},
                    "ideal_request": {"COMPUTE": 60},
                    "balance": "10"
                },
                {
                    "id": "b",
                    "name": "Beta",
                    "preferences": {"kind": "Linear", "weights": {"COMPUTE": 1.0}, "offset": 0.0},
                    "ideal_request": {"COMPUTE": 60},
                    "balance": "10"
                }
            ],
            "rounds": 3,
            "strategy": {"kind": "Zero"}
        }"#
    }

    #[test]
    fn parses_and_builds_a_driver() {
        let scenario: Scenario = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(scenario.agents.len(), 2);
        let (driver, _strategy) = scenario.build_driver().unwrap();
        assert_eq!(driver.agents().count(), 2);
    }

    #[test]
    fn earning_rate_defaults_to_none_when_absent() {
        let scenario: Scenario = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(scenario.earning_rate, None);
    }

    #[test]
    fn earning_rate_parses_when_present() {
        let json = sample_json().replacen("\"strategy\"", "\"earning_rate\": 0.05, \"strategy\"", 1);
        let scenario: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(scenario.earning_rate, Some(0.05));
    }

    #[test]
    fn loads_from_a_file_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();
        let scenario = load_scenario_from_path(file.path()).unwrap();
        assert_eq!(scenario.rounds, 3);
    }

    #[test]
    fn schedule_strategy_repeats_its_last_entry_past_the_end() {
        let mut strategy = ConfiguredStrategy::Schedule {
            schedule: vec![Decimal::new(1, 0), Decimal::new(2, 0)],
        };
        let agent_dummy = {
            let mut w = BTreeMap::new();
            w.insert(ResourceKind::Compute, 1.0);
            Agent::new(
                AgentId::new("x").unwrap(),
                "x",
                UtilityForm::linear(w, 0.0).unwrap(),
                BTreeMap::new(),
                BTreeMap::new(),
                Decimal::ZERO,
            )
            .unwrap()
        };
        assert_eq!(strategy.decide_burn(&agent_dummy, 1, 0.0), Decimal::new(1, 0));
        assert_eq!(strategy.decide_burn(&agent_dummy, 2, 0.0), Decimal::new(2, 0));
        assert_eq!(strategy.decide_burn(&agent_dummy, 5, 0.0), Decimal::new(2, 0));
    }
}
