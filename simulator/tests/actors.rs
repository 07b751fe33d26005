mod common;
use {
  common::{default_size, scenario},
  sampler_simulator::Cluster,
};

#[tokio::test]
async fn actor_nodes_converge() -> anyhow::Result<()> {
  let scenario = scenario(100, 20, 21);
  let mut cluster = Cluster::spawn(&scenario)?;
  cluster.run(scenario.rounds).await;

  let summary = cluster.overlay().await.summary();
  cluster.shutdown().await;

  assert_eq!(summary.nodes, 100);
  assert!(!summary.partitioned);
  assert_eq!(summary.out_degree.max(), Some(default_size()));
  Ok(())
}

#[tokio::test]
async fn shared_generator_converges() -> anyhow::Result<()> {
  let scenario = scenario(60, 15, 8);
  let mut cluster = Cluster::spawn_shared(&scenario)?;
  cluster.run(scenario.rounds).await;

  let summary = cluster.overlay().await.summary();
  cluster.shutdown().await;

  assert_eq!(summary.nodes, 60);
  assert!(!summary.partitioned);
  Ok(())
}
