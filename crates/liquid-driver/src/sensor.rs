//! 飞行时间测距
//!
//! # 协议
//!
//! ```text
//! trigger  ‾‾|__________________________________
//!            ^ 10μs 脉冲
//! echo     ______|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_____________
//!                start            stop
//! distance = (stop - start) × 34300 cm/s / 2
//! ```
//!
//! 两个轮询阶段都受 `max_wait` 约束（单调时钟），
//! 传感器故障时最坏阻塞 2 × `max_wait`，不会无限等待。

use crate::config::SensorConfig;
use crate::error::{DriverError, EchoTimeout};
use liquid_hal::{Clock, DigitalLine, Direction, Pull, SystemClock};
use std::time::Duration;
use tracing::{debug, trace};

/// 声速（cm/s）
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34300.0;

/// 回波持续时间换算为单程距离（cm）
///
/// 声波往返一次，因此除以 2。
pub fn distance_from_echo(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0
}

/// 测距来源
///
/// 失败（超时等）以 `None` 表示，不跨越测量边界抛出错误。
pub trait DistanceSource {
    /// 单次测量，返回原始距离（cm）
    fn measure(&mut self) -> Option<f64>;

    /// 从原始距离中扣除的偏移（cm）
    fn offset_cm(&self) -> f64 {
        0.0
    }
}

/// 超声波测距传感器
pub struct RangeSensor<T, E, C = SystemClock> {
    trigger: T,
    echo: E,
    clock: C,
    config: SensorConfig,
}

impl<T, E, C> RangeSensor<T, E, C>
where
    T: DigitalLine,
    E: DigitalLine,
    C: Clock,
{
    /// 创建传感器并配置线路
    ///
    /// - trigger：输出，初始拉低
    /// - echo：输入，上拉
    pub fn new(
        mut trigger: T,
        mut echo: E,
        clock: C,
        config: SensorConfig,
    ) -> Result<Self, DriverError> {
        config.validate()?;

        trigger.configure(Direction::Out, Pull::None)?;
        trigger.set(false);
        echo.configure(Direction::In, Pull::Up)?;

        debug!(
            "RangeSensor ready: trigger=GPIO{}, echo=GPIO{}, max_wait={:?}",
            config.trigger_line, config.echo_line, config.max_wait
        );

        Ok(Self {
            trigger,
            echo,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// 单次测量，失败时返回具体超时阶段
    ///
    /// 测量开始时 echo 已为高电平（上一次回波残留）时，第一阶段立即结束，
    /// 结果照常返回，不做修正。
    pub fn try_measure(&mut self) -> Result<f64, DriverError> {
        self.trigger.set(true);
        self.clock.sleep(self.config.trigger_pulse_duration);
        self.trigger.set(false);

        // 等待回波开始
        let mut start = self.clock.now();
        let deadline = start + self.config.max_wait;
        while !self.echo.read() && start <= deadline {
            start = self.clock.now();
        }
        if start > deadline {
            return Err(DriverError::Timeout(EchoTimeout::NeverRose));
        }

        // 等待回波结束
        let mut stop = self.clock.now();
        let deadline = stop + self.config.max_wait;
        while self.echo.read() && stop <= deadline {
            stop = self.clock.now();
        }
        if stop > deadline {
            return Err(DriverError::Timeout(EchoTimeout::NeverFell));
        }

        let elapsed = stop.saturating_duration_since(start);
        let distance = distance_from_echo(elapsed);
        trace!("echo width {:?} -> {:.2} cm", elapsed, distance);
        Ok(distance)
    }

    /// 释放线路（trigger 拉低后交还）
    pub fn release(mut self) -> (T, E) {
        self.trigger.set(false);
        (self.trigger, self.echo)
    }
}

impl<T, E, C> DistanceSource for RangeSensor<T, E, C>
where
    T: DigitalLine,
    E: DigitalLine,
    C: Clock,
{
    fn offset_cm(&self) -> f64 {
        self.config.offset_cm
    }

    fn measure(&mut self) -> Option<f64> {
        match self.try_measure() {
            Ok(distance) => Some(distance),
            Err(e) => {
                debug!("Measurement failed: {}", e);
                None
            },
        }
    }
}
