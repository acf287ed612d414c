//! # Liquid Client
//!
//! 测量结果到外部订阅者的发布链路。
//!
//! ```text
//! RangeSensor ──measure()──> MeasurementLoop ──PartialStatus──> StatusPublisher ──retain──> PublishClient
//!                                                                    ^
//!                                               (re)connect 回调 ────┘ 无条件重发
//! ```
//!
//! - [`StatusPublisher`]：持有最后发布的快照，只在渲染结果变化时发布
//! - [`MeasurementLoop`]：按固定间隔驱动测量与发布，直到收到停止信号
//! - [`PublishClient`]：发布客户端抽象（`mqtt` feature 提供 rumqttc 实现）

mod error;
pub mod measurement;
pub mod publisher;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(feature = "mqtt")]
pub mod mqtt;

pub use error::PublishError;
pub use measurement::{CycleOutcome, FailurePolicy, LoopConfig, LoopState, LoopStats, MeasurementLoop};
pub use publisher::{ConnectCallback, PublishClient, PublishOutcome, StatusPublisher};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttPublishClient, MqttSettings, TlsSettings};
