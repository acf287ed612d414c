//! 传感器参数

use crate::error::DriverError;
use std::time::Duration;

/// 传感器配置
///
/// 启动时从外部配置构造一次，之后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// trigger 线路编号（BCM）
    pub trigger_line: u8,
    /// echo 线路编号（BCM）
    pub echo_line: u8,
    /// 距离偏移（cm）
    ///
    /// 从原始飞行时间距离中减去，用于校正传感器到"零液位"参考面的几何距离。
    pub offset_cm: f64,
    /// trigger 脉冲宽度（典型值 10μs）
    pub trigger_pulse_duration: Duration,
    /// 每个轮询阶段的最长等待时间
    pub max_wait: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger_line: 23,
            echo_line: 24,
            offset_cm: 0.0,
            trigger_pulse_duration: Duration::from_micros(10),
            max_wait: Duration::from_millis(100),
        }
    }
}

impl SensorConfig {
    /// 参数校验
    ///
    /// 偏移允许为 0，但不允许为负或非有限值。
    pub fn validate(&self) -> Result<(), DriverError> {
        if !self.offset_cm.is_finite() || self.offset_cm < 0.0 {
            return Err(DriverError::InvalidConfig(format!(
                "offset_cm must be finite and >= 0, got {}",
                self.offset_cm
            )));
        }
        if self.trigger_pulse_duration.is_zero() {
            return Err(DriverError::InvalidConfig(
                "trigger_pulse_duration must be > 0".to_string(),
            ));
        }
        if self.max_wait.is_zero() {
            return Err(DriverError::InvalidConfig(
                "max_wait must be > 0".to_string(),
            ));
        }
        if self.trigger_line == self.echo_line {
            return Err(DriverError::InvalidConfig(format!(
                "trigger and echo must use different lines (both {})",
                self.trigger_line
            )));
        }
        Ok(())
    }

    /// 一次测量的最坏阻塞时间（不含 trigger 脉冲）
    pub fn worst_case_latency(&self) -> Duration {
        self.max_wait * 2
    }
}
