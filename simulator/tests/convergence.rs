mod common;
use {
  common::{default_size, push_only, scenario, with_faults},
  sampler_simulator::{Faults, Network},
};

#[test]
fn thousand_nodes_form_one_component() -> anyhow::Result<()> {
  let scenario = scenario(1000, 45, 7);
  let mut network = Network::boot(&scenario)?;
  let stats = network.run(scenario.rounds);

  assert_eq!(stats.exchanged, 1000 * 45);
  assert_eq!(stats.lost, 0);

  let summary = network.overlay().summary();
  assert_eq!(summary.nodes, 1000);
  assert!(!summary.partitioned);
  assert_eq!(summary.out_degree.min(), Some(default_size()));
  assert_eq!(summary.out_degree.max(), Some(default_size()));
  assert_eq!(summary.in_degree.total(), 1000);
  assert_eq!(summary.in_degree.count(0), 0);
  let mean = summary.in_degree.mean();
  assert!((9.0..=11.0).contains(&mean), "mean in-degree {mean}");
  assert!(summary.in_degree.std_dev() < default_size() as f64);
  Ok(())
}

#[test]
fn seeded_runs_replay_identically() -> anyhow::Result<()> {
  let scenario = with_faults(scenario(200, 20, 99), Faults {
    loss: 0.1,
    delay: 0.1,
    mortality: 0.0,
  });

  let mut first = Network::boot(&scenario)?;
  let mut second = Network::boot(&scenario)?;
  let first_stats = first.run(scenario.rounds);
  let second_stats = second.run(scenario.rounds);

  assert_eq!(first_stats, second_stats);
  assert_eq!(first.overlay(), second.overlay());
  Ok(())
}

#[test]
fn push_pull_survives_message_loss() -> anyhow::Result<()> {
  let scenario = with_faults(scenario(300, 60, 3), Faults {
    loss: 0.2,
    ..Faults::default()
  });
  let mut network = Network::boot(&scenario)?;
  let stats = network.run(scenario.rounds);
  assert!(stats.lost > 0);

  let summary = network.overlay().summary();
  assert!(!summary.partitioned);
  assert!(summary.out_degree.max() <= Some(default_size()));
  Ok(())
}

#[test]
fn views_stay_bounded_while_nodes_die() -> anyhow::Result<()> {
  let scenario = with_faults(scenario(200, 30, 11), Faults {
    mortality: 0.01,
    ..Faults::default()
  });
  let mut network = Network::boot(&scenario)?;
  let stats = network.run(scenario.rounds);

  assert!(stats.died > 0);
  assert_eq!(network.nodes().len(), 200 - stats.died);
  for view in network.nodes().values() {
    assert!(!view.is_empty());
    assert!(view.len() <= default_size());
  }
  Ok(())
}

#[test]
fn push_only_views_stay_bounded() -> anyhow::Result<()> {
  let scenario = push_only(scenario(200, 30, 5));
  let mut network = Network::boot(&scenario)?;
  let stats = network.run(scenario.rounds);

  assert_eq!(stats.pushed, 200 * 30);
  assert_eq!(stats.lost, 0);
  assert_eq!(stats.exchanged, 0);
  for view in network.nodes().values() {
    assert!(!view.is_empty());
    assert!(view.len() <= default_size());
  }
  Ok(())
}
