//! 树莓派 GPIO 后端（rppal）
//!
//! 使用 BCM 编号。`IoPin` 在 drop 时恢复引脚原始模式，
//! 进程退出时无需额外清理。

use crate::{DigitalLine, Direction, HalError, Pull};
use rppal::gpio::{Bias, Gpio, IoPin, Level, Mode};
use tracing::trace;

/// 上下拉设置对应的 rppal 偏置
fn bias_for(pull: Pull) -> Bias {
    match pull {
        Pull::None => Bias::Off,
        Pull::Up => Bias::PullUp,
        Pull::Down => Bias::PullDown,
    }
}

/// 单根树莓派 GPIO 线路
pub struct RpiLine {
    bcm: u8,
    pin: IoPin,
}

impl RpiLine {
    /// 打开 BCM 编号为 `bcm` 的线路（初始为输入模式）
    pub fn open(gpio: &Gpio, bcm: u8) -> Result<Self, HalError> {
        let pin = gpio.get(bcm).map_err(|e| HalError::LineUnavailable {
            line: bcm,
            message: e.to_string(),
        })?;

        Ok(Self {
            bcm,
            pin: pin.into_io(Mode::Input),
        })
    }

    /// 打开 GPIO 控制器
    pub fn controller() -> Result<Gpio, HalError> {
        Gpio::new().map_err(|e| HalError::Backend(e.to_string()))
    }
}

impl DigitalLine for RpiLine {
    fn configure(&mut self, direction: Direction, pull: Pull) -> Result<(), HalError> {
        let mode = match direction {
            Direction::In => Mode::Input,
            Direction::Out => Mode::Output,
        };
        let bias = bias_for(pull);

        self.pin.set_mode(mode);
        self.pin.set_bias(bias);
        trace!("GPIO{} configured as {:?} ({:?})", self.bcm, direction, pull);
        Ok(())
    }

    fn set(&mut self, level: bool) {
        self.pin.write(if level { Level::High } else { Level::Low });
    }

    fn read(&self) -> bool {
        self.pin.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_maps_to_bias() {
        assert_eq!(bias_for(Pull::None), Bias::Off);
        assert_eq!(bias_for(Pull::Up), Bias::PullUp);
        assert_eq!(bias_for(Pull::Down), Bias::PullDown);
    }
}
