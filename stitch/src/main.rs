use clap::Parser;
use combiner::BundleService;
use shared::admin::AdminService;
use shared::metrics_defs::MetricType;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

mod config;

use config::{Config, MetricsConfig};

/// Serves combined, cached CSS/JS bundles.
#[derive(Parser)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "stitch.yaml")]
    config: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", cli.config.display());
            std::process::exit(2);
        }
    };

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config);
    }

    let Some(bundle_config) = config.bundle else {
        eprintln!("config has no bundle section");
        std::process::exit(2);
    };
    if let Err(err) = bundle_config.validate() {
        eprintln!("invalid bundle config: {err}");
        std::process::exit(2);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(run(bundle_config));
}

async fn run(config: combiner::config::Config) {
    let ready = Arc::new(AtomicBool::new(false));

    let admin_host = config.admin_listener.host.clone();
    let admin_port = config.admin_listener.port;
    let admin = AdminService::new(ready.clone());
    tokio::spawn(async move {
        if let Err(err) = shared::http::run_http_service(&admin_host, admin_port, admin).await {
            tracing::error!(error = %err, "admin listener failed");
        }
    });

    let host = config.listener.host.clone();
    let port = config.listener.port;
    let listener = match shared::http::bind_listener(&host, port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, "bundle listener failed to bind");
            std::process::exit(1);
        }
    };
    let service = BundleService::new(config);

    // Readiness only once the bundle port is actually accepting.
    ready.store(true, Ordering::Relaxed);
    shared::http::serve_connections(listener, service).await;
}

fn init_metrics(config: &MetricsConfig) {
    let recorder = match metrics_exporter_statsd::StatsdBuilder::from(
        config.statsd_host.as_str(),
        config.statsd_port,
    )
    .build(Some("stitch"))
    {
        Ok(recorder) => recorder,
        Err(err) => {
            tracing::warn!(error = %err, "statsd exporter setup failed, metrics disabled");
            return;
        }
    };

    if let Err(err) = metrics::set_global_recorder(recorder) {
        tracing::warn!(error = %err, "metrics recorder already set");
        return;
    }

    for def in combiner::metrics_defs::ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}
