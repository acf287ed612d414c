//! 配置文件
//!
//! TOML 格式，默认位于可执行文件同目录下的 `settings.toml`。
//! 加载时一次性完成解析与校验，之后只读。

use liquid_client::{FailurePolicy, LoopConfig, MqttSettings};
use liquid_driver::SensorConfig;
use liquid_tools::{ContainerGeometry, GeometryError, PayloadLayout};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 默认配置文件名
pub const DEFAULT_FILE_NAME: &str = "settings.toml";

/// 最小保活间隔（秒）
const MIN_KEEPALIVE_SECS: u64 = 5;

/// 配置错误（启动期致命）
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file {} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("Config file {} found, but cannot be read: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config file {} is malformed: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// 可执行文件同目录下的默认配置路径
pub fn default_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME))
}

/// 完整配置
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSection,
    #[serde(default)]
    pub sensor: SensorSection,
    pub container: ContainerSection,
    pub mqtt: MqttSection,
}

/// `[general]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralSection {
    pub verbose: bool,
    /// 测量间隔（秒）
    pub interval: f64,
    pub on_failure: FailurePolicy,
    pub layout: PayloadLayout,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            verbose: false,
            interval: 5.0,
            on_failure: FailurePolicy::Retain,
            layout: PayloadLayout::Full,
        }
    }
}

/// `[sensor]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorSection {
    /// trigger 引脚（BCM）
    pub gpio_trigger: u8,
    /// echo 引脚（BCM）
    pub gpio_echo: u8,
    /// 距离偏移（cm）
    pub offset: f64,
    /// trigger 脉冲宽度（秒）
    pub trigger_time: f64,
    /// 单阶段最长等待（秒）
    pub max_time: f64,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            gpio_trigger: 23,
            gpio_echo: 24,
            offset: 0.0,
            trigger_time: 0.00001,
            max_time: 0.1,
        }
    }
}

/// `[container]`
///
/// 省略 `length` 表示圆柱容器，此时 `width` 为直径。
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerSection {
    pub length: Option<f64>,
    pub width: f64,
    pub height: f64,
}

/// `[mqtt]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MqttSection {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub tls: bool,
    /// CA 证书路径，为空时使用系统根证书
    #[serde(default)]
    pub cert_path: String,
    pub topic: String,
    /// 保活间隔（秒）
    #[serde(default = "default_keepalive")]
    pub keepalive: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_keepalive() -> u64 {
    60
}

/// 秒数转换为正的 `Duration`
fn positive_secs(key: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::invalid(
            key,
            format!("must be a finite number of seconds > 0, got {}", secs),
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::invalid(key, e.to_string()))
}

impl Settings {
    /// 读取、解析并校验配置文件
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// 校验所有取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_secs("general.interval", self.general.interval)?;
        positive_secs("sensor.trigger_time", self.sensor.trigger_time)?;
        positive_secs("sensor.max_time", self.sensor.max_time)?;

        if !self.sensor.offset.is_finite() || self.sensor.offset < 0.0 {
            return Err(ConfigError::invalid(
                "sensor.offset",
                format!("must be a finite distance >= 0, got {}", self.sensor.offset),
            ));
        }
        if self.sensor.gpio_trigger == self.sensor.gpio_echo {
            return Err(ConfigError::invalid(
                "sensor.gpio_echo",
                format!("must differ from gpio_trigger ({})", self.sensor.gpio_trigger),
            ));
        }

        self.geometry()?;

        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::invalid("mqtt.host", "must not be empty"));
        }
        if self.topic().is_empty() {
            return Err(ConfigError::invalid("mqtt.topic", "must not be empty"));
        }
        if self.mqtt.keepalive < MIN_KEEPALIVE_SECS {
            return Err(ConfigError::invalid(
                "mqtt.keepalive",
                format!(
                    "must be at least {} seconds, got {}",
                    MIN_KEEPALIVE_SECS, self.mqtt.keepalive
                ),
            ));
        }

        Ok(())
    }

    /// 容器几何（`length` 缺省为圆柱）
    pub fn geometry(&self) -> Result<ContainerGeometry, ConfigError> {
        let container = &self.container;
        let geometry = match container.length {
            Some(length) => ContainerGeometry::rectangular(length, container.width, container.height)?,
            None => ContainerGeometry::cylindrical(container.width, container.height)?,
        };
        Ok(geometry)
    }

    pub fn sensor_config(&self) -> Result<SensorConfig, ConfigError> {
        Ok(SensorConfig {
            trigger_line: self.sensor.gpio_trigger,
            echo_line: self.sensor.gpio_echo,
            offset_cm: self.sensor.offset,
            trigger_pulse_duration: positive_secs("sensor.trigger_time", self.sensor.trigger_time)?,
            max_wait: positive_secs("sensor.max_time", self.sensor.max_time)?,
        })
    }

    pub fn loop_config(&self) -> Result<LoopConfig, ConfigError> {
        Ok(LoopConfig {
            interval: positive_secs("general.interval", self.general.interval)?,
            failure_policy: self.general.on_failure,
        })
    }

    /// 发布主题（去除首尾空白）
    pub fn topic(&self) -> &str {
        self.mqtt.topic.trim()
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        let mqtt = &self.mqtt;
        let settings = MqttSettings::new(mqtt.host.trim(), mqtt.port)
            .keep_alive(Duration::from_secs(mqtt.keepalive))
            .set_credentials(mqtt.user.as_str(), mqtt.pass.as_str());

        if !mqtt.tls {
            return settings;
        }
        let cert_path = mqtt.cert_path.trim();
        settings.set_transport_security((!cert_path.is_empty()).then(|| PathBuf::from(cert_path)))
    }
}
