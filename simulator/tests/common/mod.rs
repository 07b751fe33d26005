use {
  sampler_simulator::{Faults, Scenario},
  sampler_view::{Config, Mode},
};

/// A reproducible push-pull scenario with default views and no faults.
pub fn scenario(nodes: usize, rounds: usize, seed: u64) -> Scenario {
  Scenario {
    nodes,
    rounds,
    seed: Some(seed),
    ..Scenario::default()
  }
}

pub fn with_faults(mut scenario: Scenario, faults: Faults) -> Scenario {
  scenario.faults = faults;
  scenario
}

pub fn push_only(mut scenario: Scenario) -> Scenario {
  scenario.mode = Mode::Push;
  scenario
}

pub fn default_size() -> usize {
  Config::default().size
}
