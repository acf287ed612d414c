//! # liquid2mqtt
//!
//! 超声波液位测量，换算为体积后以 retained 消息发布到 MQTT。
//!
//! ```bash
//! # 使用可执行文件同目录下的 settings.toml
//! liquid2mqtt
//!
//! # 指定配置文件，打开测量输出
//! liquid2mqtt --config /etc/liquid2mqtt/settings.toml --verbose true
//! ```
//!
//! Ctrl+C 后完成当前测量、释放 GPIO 并以退出码 0 结束。

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::BoolishValueParser;
use config::Settings;
use liquid_client::{MeasurementLoop, MqttPublishClient, PublishClient, StatusPublisher};
use liquid_driver::RangeSensor;
use liquid_hal::{RpiLine, SystemClock};
use liquid_tools::StatusSnapshot;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 超声波液位 -> MQTT
#[derive(Parser, Debug)]
#[command(name = "liquid2mqtt")]
#[command(about = "Liquid level measurement published over MQTT", long_about = None)]
#[command(version)]
struct Args {
    /// 配置文件路径
    ///
    /// 默认: 可执行文件同目录下的 settings.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出测量过程（覆盖配置文件中的 general.verbose）
    #[arg(long, value_parser = BoolishValueParser::new())]
    verbose: Option<bool>,
}

/// 初始化日志
///
/// verbose 时默认级别为 info，否则为 warn；`RUST_LOG` 优先。
fn init_logging(verbose: bool) {
    let default_directive = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(config::default_path);
    let settings = Settings::load(&config_path)?;

    init_logging(args.verbose.unwrap_or(settings.general.verbose));
    info!("Loaded configuration from {}", config_path.display());

    run(&settings)
}

fn run(settings: &Settings) -> Result<()> {
    let sensor_config = settings.sensor_config()?;
    let loop_config = settings.loop_config()?;
    let geometry = settings.geometry()?;

    // 1. GPIO：trigger 输出（拉低），echo 输入（上拉）
    let gpio = RpiLine::controller().context("Failed to open GPIO controller")?;
    let trigger = RpiLine::open(&gpio, sensor_config.trigger_line)
        .context("Failed to open trigger line")?;
    let echo =
        RpiLine::open(&gpio, sensor_config.echo_line).context("Failed to open echo line")?;
    let sensor = RangeSensor::new(trigger, echo, SystemClock, sensor_config)
        .context("Failed to initialize range sensor")?;

    // 2. MQTT：注册重连回调后再开始连接，首次连接即发布启动快照
    let client = MqttPublishClient::new(settings.mqtt_settings())
        .context("Failed to create MQTT client")?;
    let publisher = StatusPublisher::shared(
        client,
        settings.topic(),
        StatusSnapshot::initial(&geometry),
        settings.general.layout,
    );
    publisher
        .client()
        .connect()
        .context("Failed to start MQTT connection")?;

    // 3. 信号处理（Ctrl+C 优雅退出）
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("Failed to install signal handler")?;

    // 4. 测量循环
    let mut measurement = MeasurementLoop::new(sensor, publisher, geometry, loop_config);
    let stats = measurement.run(&shutdown_rx);

    let _lines = measurement.into_source().release();
    info!(
        "Measurement stopped: {} published, {} unchanged, {} failed, {} publish errors",
        stats.published, stats.unchanged, stats.failures, stats.publish_errors
    );

    Ok(())
}
