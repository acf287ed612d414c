//! 测量循环
//!
//! # 状态机
//!
//! ```text
//! Idle -> Measuring -> (Success | Failure) -> Idle -> Sleeping -> Measuring -> ...
//!                                                          |
//!                                                  停止信号 v
//!                                                       Stopped
//! ```
//!
//! `step()` 结束时回到 `Idle`；`Sleeping` 只出现在 `run()` 的间隔等待中。
//!
//! 单线程、顺序执行。停止信号只在两次测量之间（间隔等待期间）被观察，
//! 正在进行的测量（最多 2 × `max_wait`）会先完成。

use crate::publisher::{PublishClient, PublishOutcome, StatusPublisher};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use liquid_driver::DistanceSource;
use liquid_tools::{ContainerGeometry, PartialStatus, StatusSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 测量失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// 不发布，保留上一次快照
    #[default]
    Retain,
    /// 发布哨兵值（距离、液位、体积为 -1），显式标记失败
    Sentinel,
}

/// 测量循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 测量间隔
    pub interval: Duration,
    /// 失败策略
    pub failure_policy: FailurePolicy,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            failure_policy: FailurePolicy::Retain,
        }
    }
}

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Measuring,
    Sleeping,
    Stopped,
}

/// 单次循环结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 测量成功，状态变化已发布
    Published,
    /// 测量成功，状态未变化
    Unchanged,
    /// 测量失败
    Failed,
    /// 测量成功但发布失败
    PublishFailed,
}

/// 循环统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub cycles: u64,
    pub published: u64,
    pub unchanged: u64,
    pub failures: u64,
    pub publish_errors: u64,
}

impl LoopStats {
    fn record(&mut self, outcome: CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::Published => self.published += 1,
            CycleOutcome::Unchanged => self.unchanged += 1,
            CycleOutcome::Failed => self.failures += 1,
            CycleOutcome::PublishFailed => self.publish_errors += 1,
        }
    }
}

/// 测量循环
pub struct MeasurementLoop<S, C> {
    source: S,
    publisher: Arc<StatusPublisher<C>>,
    geometry: ContainerGeometry,
    config: LoopConfig,
    state: LoopState,
    stats: LoopStats,
}

impl<S, C> MeasurementLoop<S, C>
where
    S: DistanceSource,
    C: PublishClient,
{
    pub fn new(
        source: S,
        publisher: Arc<StatusPublisher<C>>,
        geometry: ContainerGeometry,
        config: LoopConfig,
    ) -> Self {
        Self {
            source,
            publisher,
            geometry,
            config,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn publisher(&self) -> &Arc<StatusPublisher<C>> {
        &self.publisher
    }

    /// 执行一次测量并（按需）发布
    ///
    /// 距离偏移取自测距来源（[`DistanceSource::offset_cm`]）。
    /// 返回时状态回到 `Idle`。
    pub fn step(&mut self) -> CycleOutcome {
        self.state = LoopState::Measuring;

        let outcome = match self.source.measure() {
            Some(raw_distance) => {
                let distance = raw_distance - self.source.offset_cm();
                let snapshot = StatusSnapshot::from_distance(distance, &self.geometry);

                info!("Measured distance = {:.1} cm", snapshot.current_distance);
                info!(
                    "Current level = {:.1} cm (with maximum level = {:.1} cm)",
                    snapshot.current_level, snapshot.max_level
                );
                info!(
                    "Current volume = {:.1} liters (with maximum volume = {:.1} liters)",
                    snapshot.current_volume, snapshot.max_volume
                );

                match self.publisher.apply_delta(&PartialStatus::full(&snapshot)) {
                    Ok(PublishOutcome::Published) => CycleOutcome::Published,
                    Ok(PublishOutcome::Unchanged) => {
                        debug!("Status unchanged, nothing published");
                        CycleOutcome::Unchanged
                    },
                    Err(e) => {
                        warn!("Failed to publish status: {}", e);
                        CycleOutcome::PublishFailed
                    },
                }
            },
            None => {
                info!("Measurement failed");
                if self.config.failure_policy == FailurePolicy::Sentinel
                    && let Err(e) = self.publisher.apply_delta(&PartialStatus::failed())
                {
                    warn!("Failed to publish failure status: {}", e);
                }
                CycleOutcome::Failed
            },
        };

        self.stats.record(outcome);
        self.state = LoopState::Idle;
        outcome
    }

    /// 循环运行，直到 `shutdown` 收到消息或所有发送端断开
    ///
    /// 间隔等待直接阻塞在 `shutdown` 上，停止信号无需等满一个间隔。
    pub fn run(&mut self, shutdown: &Receiver<()>) -> LoopStats {
        info!(
            "Measurement loop started (interval {:?}, failure policy {:?})",
            self.config.interval, self.config.failure_policy
        );

        loop {
            self.step();

            self.state = LoopState::Sleeping;
            match shutdown.recv_timeout(self.config.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.state = LoopState::Stopped;
        info!("Measurement stopped after {} cycles", self.stats.cycles);
        self.stats
    }

    /// 交还测距来源（用于释放线路）
    pub fn into_source(self) -> S {
        self.source
    }
}
