//! 单调时钟抽象

use std::time::{Duration, Instant};

/// 单调时间源
///
/// 测距协议依赖微秒级的时间差，因此必须使用单调时钟，
/// 不受系统时间调整影响。
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// 系统单调时钟
///
/// `sleep` 使用 `spin_sleep`，trigger 脉冲只有约 10μs，
/// `std::thread::sleep` 的 1-2ms 抖动无法满足。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        spin_sleep::sleep(duration);
    }
}
