//! 驱动层错误类型定义

use liquid_hal::HalError;
use std::fmt;
use thiserror::Error;

/// echo 超时的具体阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoTimeout {
    /// 等待 echo 拉高超时（未检测到回波开始）
    NeverRose,
    /// 等待 echo 拉低超时（回波未结束）
    NeverFell,
}

impl fmt::Display for EchoTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoTimeout::NeverRose => write!(f, "echo never rose"),
            EchoTimeout::NeverFell => write!(f, "echo never fell"),
        }
    }
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// HAL 层错误（线路配置失败等）
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// 测距超时
    #[error("Measurement timeout: {0}")]
    Timeout(EchoTimeout),

    /// 无效传感器参数
    #[error("Invalid sensor configuration: {0}")]
    InvalidConfig(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }
}
