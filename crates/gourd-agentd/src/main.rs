//! gourd edge agent daemon.

mod agent;
mod api;
mod capture;
mod config;
mod restart;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gourd_api::HttpApi;
use gourd_core::{AgentSettings, ConfigStore, StorageSettings, resolve_device_id};
use gourd_observe::{FileOutput, LoggerConfig, logger_init};
use gourd_upload::{CodecTool, HttpMessageChannel, HttpObjectStore, ObjectStore};
use tokio::{net::TcpListener, sync::mpsc::unbounded_channel};
use tracing::{error, info};

use crate::{
    agent::{AgentParts, EdgeAgent, StoreFactory},
    api::AgentApi,
    capture::CaptureCommands,
    config::AgentArgs,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AgentArgs::parse();
    gourd_core::init_uptime();

    // 1) Persisted configuration
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data dir {}", args.data_dir.display()))?;
    let config = ConfigStore::open(args.config_path())?;
    let settings = AgentSettings::from_document(&config.snapshot());

    // 2) Logger
    let file = args
        .log_to_file
        .then(|| FileOutput::new(args.logs_dir(), settings.log_when.parse().unwrap_or_default()));
    let logger = logger_init(&LoggerConfig {
        format: args.log_format.parse()?,
        level: args.log_level.clone(),
        file,
        ..Default::default()
    })?;
    let logger = Arc::new(logger);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = gourd_core::platform(),
        arch = gourd_core::arch(),
        os = %gourd_core::os_info(),
        config = %args.config_path().display(),
        "gourd agent starting"
    );

    // 3) Telemetry link and agent
    let device_id = resolve_device_id(&settings.device_id);
    let (deliveries_tx, deliveries_rx) = unbounded_channel();
    let channel = HttpMessageChannel::new(&args.telemetry_endpoint, &device_id, deliveries_tx)?;
    info!(%device_id, endpoint = %args.telemetry_endpoint, "telemetry channel ready");

    let agent = EdgeAgent::new(AgentParts {
        data_dir: args.data_dir.clone(),
        config,
        channel: Arc::new(channel),
        deliveries: deliveries_rx,
        stores: store_factory(args.storage_endpoint.clone()),
        codec: Some(CodecTool::new(&args.codec_program)),
        captures: CaptureCommands {
            sensor: args.sensor_cmd.clone(),
            image: args.image_cmd.clone(),
            video: args.video_cmd.clone(),
        },
        restart_cmd: args.restart_cmd.clone(),
        logger: Some(logger.clone()),
    });
    agent.start();
    tokio::spawn({
        let agent = agent.clone();
        async move { agent.report_startup().await }
    });

    // 4) Local API
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    info!(addr = %args.bind, "local api listening");
    let app = HttpApi::new(Arc::new(AgentApi::new(agent.clone()))).router();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutting down...");
        })
        .await?;

    agent.stop();
    Ok(())
}

/// Object stores speak to `--storage-endpoint` with the configured account credentials.
fn store_factory(endpoint: Option<String>) -> StoreFactory {
    Arc::new(move |storage: &StorageSettings| {
        let Some(endpoint) = &endpoint else {
            error!("no storage endpoint configured; uploads disabled");
            return None;
        };
        match HttpObjectStore::new(endpoint.as_str(), &storage.account_name, &storage.account_key) {
            Ok(store) => Some(Arc::new(store) as Arc<dyn ObjectStore>),
            Err(e) => {
                error!(error = %e, "failed to build object store client");
                None
            }
        }
    })
}
