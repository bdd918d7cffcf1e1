//! Mirage - E-ink Display Controller Binary
//!
//! Composition root: builds the metrics registry, panel driver,
//! controller, and sampler, then serves the HTTP API until interrupted.

use clap::Parser;
use mirage::{
    config::{DisplayConfig, SamplerConfig, StorageConfig},
    AppState, ColourMode, Controller, DisplayDriver, ImageStore, Metrics, PeriodicSampler,
    Resolution, SimPanel, SystemCollector, SystemControl, WebConfig, DEFAULT_WEB_PORT,
};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "mirage")]
#[command(about = "Mirage - e-ink display controller")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Accepts image uploads over HTTP, renders them to an attached \
e-ink panel, and reports system and hardware health")]
struct Cli {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Background sampling interval in seconds
    #[arg(short, long, default_value_t = mirage::config::DEFAULT_SAMPLER_INTERVAL_SECS)]
    interval: u64,

    /// Directory uploaded images are stored in
    #[arg(long, default_value = "instance/images")]
    upload_dir: String,

    /// Number of uploaded images kept on disk
    #[arg(long, default_value_t = mirage::config::DEFAULT_KEEP_IMAGES)]
    keep_last: usize,

    /// Lock timeout for health probes, in seconds
    #[arg(long, default_value_t = mirage::config::DEFAULT_PROBE_TIMEOUT_SECS)]
    probe_timeout: u64,

    /// Lock timeout for display refreshes, in seconds
    #[arg(long, default_value_t = mirage::config::DEFAULT_REFRESH_TIMEOUT_SECS)]
    refresh_timeout: u64,

    /// Name of the systemd unit managed via /system/service
    #[arg(long, default_value = "mirage")]
    service_name: String,

    /// File the simulated panel renders to (no hardware driver is
    /// compiled into this binary; see the Panel trait)
    #[arg(long, default_value = "instance/panel.png")]
    panel_output: String,

    /// Simulated panel width in pixels
    #[arg(long, default_value_t = 600)]
    panel_width: u32,

    /// Simulated panel height in pixels
    #[arg(long, default_value_t = 448)]
    panel_height: u32,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let display_config = DisplayConfig::default()
        .with_probe_timeout(cli.probe_timeout)
        .with_refresh_timeout(cli.refresh_timeout);
    display_config.validate()?;

    let sampler_config = SamplerConfig::default().with_interval(cli.interval);
    sampler_config.validate()?;

    // The store shares the driver's accepted-extension set, so nothing
    // the panel would reject is ever written to disk
    let storage_config = StorageConfig::default()
        .with_image_dir(&cli.upload_dir)
        .with_keep_last(cli.keep_last)
        .with_supported_formats(display_config.supported_formats.clone());

    let web_config = WebConfig::new(&cli.host, cli.port).with_cors(!cli.no_cors);

    let metrics = Arc::new(Metrics::new()?);

    let panel = SimPanel::new(
        Resolution::new(cli.panel_width, cli.panel_height),
        ColourMode::Multi,
        &cli.panel_output,
    );

    // Fatal if the panel cannot be opened; there is no degraded mode
    let driver = Arc::new(
        DisplayDriver::new(Box::new(panel), display_config.clone(), Arc::clone(&metrics)).await?,
    );

    let controller = Arc::new(Controller::new(
        driver,
        SystemCollector::new()?,
        SystemControl::new(&cli.service_name),
        ImageStore::new(storage_config),
        metrics,
        display_config,
    ));

    let sampler = PeriodicSampler::start(Arc::clone(&controller), sampler_config);

    info!("mirage {} starting", env!("CARGO_PKG_VERSION"));
    info!("  - bind address: {}:{}", cli.host, cli.port);
    info!("  - upload dir: {}", cli.upload_dir);
    info!("  - sampling interval: {}s", cli.interval);

    let state = AppState { controller };
    mirage::serve(web_config, state, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    // Controlled teardown: the composition root owns the sampler handle
    sampler.shutdown().await;
    info!("mirage stopped");

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["mirage", "--port", "9090"]).unwrap();
        assert_eq!(cli.port, 9090);
    }

    #[test]
    fn test_default_values() {
        use clap::Parser;

        let cli = Cli::try_parse_from(["mirage"]).unwrap();
        assert_eq!(cli.port, DEFAULT_WEB_PORT);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.interval, mirage::config::DEFAULT_SAMPLER_INTERVAL_SECS);
        assert_eq!(cli.keep_last, mirage::config::DEFAULT_KEEP_IMAGES);
    }
}
