use {
  crate::cli::CliOptions,
  clap::Parser,
  metrics_exporter_prometheus::PrometheusBuilder,
  sampler_simulator::{Cluster, Network, Summary},
  tracing::{info, warn},
  tracing_subscriber::{EnvFilter, FmtSubscriber},
};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing::subscriber::set_global_default(
    FmtSubscriber::builder()
      .with_env_filter(EnvFilter::from_default_env())
      .finish(),
  )?;

  let opts = CliOptions::parse();
  info!("simulator options: {opts:?}");

  if let Some(addr) = opts.metrics {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
  }

  let scenario = opts.scenario();
  scenario.validate()?;

  let summary: Summary = if opts.actors {
    let mut cluster = if opts.shared_rng {
      Cluster::spawn_shared(&scenario)?
    } else {
      Cluster::spawn(&scenario)?
    };
    cluster.run(scenario.rounds).await;
    let summary = cluster.overlay().await.summary();
    cluster.shutdown().await;
    summary
  } else {
    let mut network = Network::boot(&scenario)?;
    let stats = network.run(scenario.rounds);
    info!("after {} rounds: {stats:?}", network.round_count());
    network.overlay().summary()
  };

  println!("{summary}");
  if summary.partitioned {
    warn!("the overlay is partitioned");
  }

  Ok(())
}
