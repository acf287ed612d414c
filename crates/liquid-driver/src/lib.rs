//! # Liquid Driver
//!
//! 超声波测距传感器驱动（trigger/echo 双线协议）。
//!
//! - [`RangeSensor`]：驱动 trigger/echo 线路完成一次飞行时间测量
//! - [`DistanceSource`]：测距来源抽象，供测量循环使用
//! - [`SensorConfig`]：传感器参数（启动时加载，之后只读）

mod config;
mod error;
mod sensor;

pub use config::SensorConfig;
pub use error::{DriverError, EchoTimeout};
pub use sensor::{DistanceSource, RangeSensor, SPEED_OF_SOUND_CM_PER_S, distance_from_echo};
