//! Mock 硬件
//!
//! - [`MockLine`]：电平固定、可由测试直接驱动的线路
//! - [`EchoSimulator`]：共享模拟时钟的 trigger/echo 传感器，
//!   echo 脉冲时序相对 trigger 下降沿定义，测距结果可精确预测

use crate::{Clock, DigitalLine, Direction, HalError, Pull};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct MockLineState {
    level: bool,
    writes: Vec<bool>,
    configuration: Option<(Direction, Pull)>,
}

/// 模拟线路
///
/// `Clone` 共享同一内部状态，测试侧保留一份副本用于驱动电平与检查写入。
#[derive(Debug, Clone, Default)]
pub struct MockLine {
    state: Arc<Mutex<MockLineState>>,
}

impl MockLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置输入电平（模拟外部驱动）
    pub fn set_level(&self, level: bool) {
        self.state.lock().level = level;
    }

    /// 所有 `set()` 调用记录
    pub fn writes(&self) -> Vec<bool> {
        self.state.lock().writes.clone()
    }

    pub fn configuration(&self) -> Option<(Direction, Pull)> {
        self.state.lock().configuration
    }
}

impl DigitalLine for MockLine {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError> {
        self.state.lock().configuration = Some((direction, pull));
        Ok(())
    }

    fn set(&mut self, level: bool) {
        let mut state = self.state.lock();
        state.level = level;
        state.writes.push(level);
    }

    fn read(&self) -> bool {
        self.state.lock().level
    }
}

/// 模拟 echo 行为（相对 trigger 下降沿）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EchoProfile {
    /// 延迟 `delay` 后拉高，保持 `width`
    Pulse { delay: Duration, width: Duration },
    /// echo 从不拉高（传感器未连接）
    NeverRises,
    /// 延迟 `delay` 后拉高且不再拉低（传感器卡死）
    StuckHigh { delay: Duration },
}

#[derive(Debug)]
struct SimState {
    elapsed: Duration,
    tick: Duration,
    trigger_high: bool,
    released_at: Option<Duration>,
    pulses: usize,
    profile: EchoProfile,
    configuration: Vec<(Direction, Pull)>,
}

/// 模拟超声波传感器
///
/// 时钟每次 `now()` 前进一个 `tick`（模拟一次轮询的开销），
/// `sleep()` 直接推进时间，不会真正阻塞。
#[derive(Debug, Clone)]
pub struct EchoSimulator {
    origin: Instant,
    state: Arc<Mutex<SimState>>,
}

impl EchoSimulator {
    pub fn new(profile: EchoProfile, tick: Duration) -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::new(Mutex::new(SimState {
                elapsed: Duration::ZERO,
                tick,
                trigger_high: false,
                released_at: None,
                pulses: 0,
                profile,
                configuration: Vec::new(),
            })),
        }
    }

    /// 已知往返时间 `round_trip` 的回波，1μs 轮询粒度
    pub fn pulse(round_trip: Duration) -> Self {
        Self::new(
            EchoProfile::Pulse {
                delay: Duration::from_micros(100),
                width: round_trip,
            },
            Duration::from_micros(1),
        )
    }

    pub fn set_profile(&self, profile: EchoProfile) {
        self.state.lock().profile = profile;
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            origin: self.origin,
            state: Arc::clone(&self.state),
        }
    }

    pub fn trigger(&self) -> SimTrigger {
        SimTrigger {
            state: Arc::clone(&self.state),
        }
    }

    pub fn echo(&self) -> SimEcho {
        SimEcho {
            state: Arc::clone(&self.state),
        }
    }

    /// 模拟时间总流逝
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// 完整 trigger 脉冲（高 -> 低）次数
    pub fn trigger_pulses(&self) -> usize {
        self.state.lock().pulses
    }

    pub fn trigger_level(&self) -> bool {
        self.state.lock().trigger_high
    }

    /// 按调用顺序记录的线路配置（trigger 与 echo 共用）
    pub fn configurations(&self) -> Vec<(Direction, Pull)> {
        self.state.lock().configuration.clone()
    }
}

/// 模拟时钟
#[derive(Debug, Clone)]
pub struct SimClock {
    origin: Instant,
    state: Arc<Mutex<SimState>>,
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        let mut state = self.state.lock();
        let tick = state.tick;
        state.elapsed += tick;
        self.origin + state.elapsed
    }

    fn sleep(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }
}

/// 模拟 trigger 线路
#[derive(Debug, Clone)]
pub struct SimTrigger {
    state: Arc<Mutex<SimState>>,
}

impl DigitalLine for SimTrigger {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError> {
        self.state.lock().configuration.push((direction, pull));
        Ok(())
    }

    fn set(&mut self, level: bool) {
        let mut state = self.state.lock();
        if state.trigger_high && !level {
            let now = state.elapsed;
            state.released_at = Some(now);
            state.pulses += 1;
        }
        state.trigger_high = level;
    }

    fn read(&self) -> bool {
        self.state.lock().trigger_high
    }
}

/// 模拟 echo 线路
#[derive(Debug, Clone)]
pub struct SimEcho {
    state: Arc<Mutex<SimState>>,
}

impl DigitalLine for SimEcho {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError> {
        if direction != Direction::In {
            return Err(HalError::UnsupportedConfig(
                "echo line is input only".to_string(),
            ));
        }
        self.state.lock().configuration.push((direction, pull));
        Ok(())
    }

    fn set(&mut self, _level: bool) {}

    fn read(&self) -> bool {
        let state = self.state.lock();
        let Some(released_at) = state.released_at else {
            return false;
        };
        let t = state.elapsed.saturating_sub(released_at);

        match state.profile {
            EchoProfile::Pulse { delay, width } => t >= delay && t < delay + width,
            EchoProfile::NeverRises => false,
            EchoProfile::StuckHigh { delay } => t >= delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_line_records_writes() {
        let line = MockLine::new();
        let mut handle = line.clone();

        handle.set(true);
        handle.set(false);
        assert_eq!(line.writes(), vec![true, false]);
        assert!(!line.read());

        line.set_level(true);
        assert!(handle.read());
    }

    #[test]
    fn test_sim_clock_advances_per_poll() {
        let sim = EchoSimulator::new(EchoProfile::NeverRises, Duration::from_micros(5));
        let clock = sim.clock();

        let a = clock.now();
        let b = clock.now();
        assert_eq!(b - a, Duration::from_micros(5));

        clock.sleep(Duration::from_millis(1));
        assert_eq!(sim.elapsed(), Duration::from_micros(1010));
    }

    #[test]
    fn test_echo_follows_trigger_release() {
        let sim = EchoSimulator::new(
            EchoProfile::Pulse {
                delay: Duration::from_micros(10),
                width: Duration::from_micros(20),
            },
            Duration::from_micros(1),
        );
        let clock = sim.clock();
        let mut trigger = sim.trigger();
        let echo = sim.echo();

        // trigger 之前 echo 保持低电平
        clock.sleep(Duration::from_micros(50));
        assert!(!echo.read());

        trigger.set(true);
        clock.sleep(Duration::from_micros(10));
        trigger.set(false);
        assert_eq!(sim.trigger_pulses(), 1);

        clock.sleep(Duration::from_micros(9));
        assert!(!echo.read());
        clock.sleep(Duration::from_micros(1));
        assert!(echo.read());
        clock.sleep(Duration::from_micros(19));
        assert!(echo.read());
        clock.sleep(Duration::from_micros(1));
        assert!(!echo.read());
    }

    #[test]
    fn test_stuck_high_never_falls() {
        let sim = EchoSimulator::new(
            EchoProfile::StuckHigh {
                delay: Duration::ZERO,
            },
            Duration::from_micros(1),
        );
        let mut trigger = sim.trigger();
        trigger.set(true);
        trigger.set(false);

        sim.clock().sleep(Duration::from_secs(10));
        assert!(sim.echo().read());
    }

    #[test]
    fn test_sim_echo_rejects_output() {
        let sim = EchoSimulator::pulse(Duration::from_millis(1));
        let mut echo = sim.echo();
        assert!(echo.configure(Direction::Out, Pull::None).is_err());
        assert!(echo.configure(Direction::In, Pull::Up).is_ok());
        assert_eq!(sim.configurations(), vec![(Direction::In, Pull::Up)]);
    }
}
