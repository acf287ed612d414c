//! # Liquid HAL
//!
//! 数字线路与时钟的硬件抽象层，为超声波测距提供统一接口。
//!
//! - [`DigitalLine`]：单根 GPIO 线（trigger 输出 / echo 输入）
//! - [`Clock`]：单调时钟（亚毫秒精度）
//!
//! 具体后端：
//! - `rpi` feature：基于 `rppal` 的树莓派 GPIO
//! - `mock` feature：测试用模拟线路与模拟时钟

use thiserror::Error;

mod clock;

pub use clock::{Clock, SystemClock};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "rpi")]
pub mod rpi;

#[cfg(feature = "rpi")]
pub use rpi::RpiLine;

/// HAL 层统一错误类型
#[derive(Error, Debug)]
pub enum HalError {
    #[error("GPIO line {line} unavailable: {message}")]
    LineUnavailable { line: u8, message: String },
    #[error("Unsupported line configuration: {0}")]
    UnsupportedConfig(String),
    #[error("GPIO backend error: {0}")]
    Backend(String),
}

/// 线路方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// 上下拉电阻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

/// 单根数字线路
///
/// 读写延迟应在微秒量级，`set`/`read` 本身不会失败；
/// 只有 `configure` 可能因后端拒绝而返回错误。
pub trait DigitalLine {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError>;
    fn set(&mut self, level: bool);
    fn read(&self) -> bool;
}

impl<T: DigitalLine + ?Sized> DigitalLine for Box<T> {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError> {
        (**self).configure(direction, pull)
    }

    fn set(&mut self, level: bool) {
        (**self).set(level)
    }

    fn read(&self) -> bool {
        (**self).read()
    }
}
