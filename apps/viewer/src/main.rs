mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use session_core::{
    ControllerEvent, ControllerSettings, HttpSessionClient, LifecycleState, SessionController,
};
use shared::{
    domain::SimulationVariant,
    protocol::{SimulationConfig, WildfireTunables},
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Warehouse,
    Wildfire,
}

impl From<VariantArg> for SimulationVariant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Warehouse => SimulationVariant::Warehouse,
            VariantArg::Wildfire => SimulationVariant::Wildfire,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "viewer.toml")]
    config: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long, value_enum, default_value_t = VariantArg::Warehouse)]
    variant: VariantArg,
    #[arg(long, default_value_t = 40)]
    width: u32,
    #[arg(long, default_value_t = 40)]
    height: u32,
    /// Robots for the warehouse, trees per row for the wildfire.
    #[arg(long, default_value_t = 40)]
    number: u32,
    #[arg(long)]
    speed: Option<f64>,
    #[arg(long, default_value_t = 100)]
    probability: u8,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    south_wind: i32,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    west_wind: i32,
    #[arg(long)]
    big_jumps: bool,
}

impl Args {
    fn simulation_config(&self) -> SimulationConfig {
        let variant = SimulationVariant::from(self.variant);
        let config = SimulationConfig::new(variant, self.width, self.height, self.number);
        match variant {
            SimulationVariant::Warehouse => config,
            SimulationVariant::Wildfire => config.with_wildfire(WildfireTunables {
                probability_of_spread: self.probability,
                south_wind_speed: self.south_wind,
                west_wind_speed: self.west_wind,
                big_jumps: self.big_jumps,
            }),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config)?;
    if let Some(server_url) = &args.server_url {
        settings.server_url = server_url.clone();
    }
    if let Some(speed) = args.speed {
        settings.sim_speed = speed;
    }
    let server_url = config::normalize_server_url(&settings.server_url)?;

    let client = HttpSessionClient::new(&server_url, settings.request_timeout())
        .context("failed to build engine client")?;
    let controller = SessionController::new(
        Arc::new(client),
        ControllerSettings {
            base_period: settings.base_period(),
            sim_speed: settings.sim_speed,
        },
    )
    .context("invalid controller settings")?;

    let mut events = BroadcastStream::new(controller.subscribe_events());
    let simulation = args.simulation_config();
    info!(
        server_url = %server_url,
        variant = %simulation.variant,
        width = simulation.width,
        height = simulation.height,
        number = simulation.number,
        "viewer: configuring session"
    );
    controller
        .configure(simulation)
        .await
        .context("failed to create simulation session")?;
    info!(
        poll_period_ms = controller.poll_period().await.as_millis() as u64,
        "viewer: session ready, starting"
    );
    controller.start().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("viewer: interrupted, stopping session");
                controller.stop().await;
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break };
                match event {
                    Ok(ControllerEvent::Snapshot(snapshot)) => {
                        let metrics = &snapshot.metrics;
                        info!(
                            iteration = snapshot.iteration,
                            completion = %metrics.completion_label(),
                            remaining = metrics.remaining,
                            agents_moving = metrics.agents_moving,
                            stored_boxes = metrics.stored_boxes,
                            "viewer: snapshot"
                        );
                    }
                    Ok(ControllerEvent::Error(err)) => {
                        warn!(error = %err, "viewer: engine request failed");
                    }
                    Ok(ControllerEvent::Lifecycle(LifecycleState::Stopped)) => {
                        info!("viewer: simulation finished");
                        break;
                    }
                    Ok(ControllerEvent::Lifecycle(lifecycle)) => {
                        info!(?lifecycle, "viewer: lifecycle changed");
                    }
                    Err(err) => {
                        warn!(error = %err, "viewer: event stream lagged");
                    }
                }
            }
        }
    }

    let history = controller.completion_history().await;
    if let Some(last) = history.last() {
        info!(
            samples = history.len(),
            final_completion = last * 100.0,
            "viewer: run summary"
        );
    }
    Ok(())
}
