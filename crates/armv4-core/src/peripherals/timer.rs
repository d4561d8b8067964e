use std::any::Any;

use super::{Peripheral, PeripheralError, IRQ_TIMER};
use crate::memory::AccessWidth;

/// Offset of the reload / current count register.
pub const TIMER_REG_COUNT: u32 = 0x0;
/// Offset of the control register.
pub const TIMER_REG_CONTROL: u32 = 0x4;
/// Control bit: counting enabled.
pub const TIMER_ENABLE: u32 = 1 << 0;

/// Countdown timer decremented once per poll.
///
/// Writing the count register sets both the reload value and the current
/// count. On reaching zero the count reloads and [`IRQ_TIMER`] is raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    reload: u32,
    count: u32,
    control: u32,
    default_reload: u32,
}

impl Timer {
    /// Creates a timer with a reset reload value of `interval` polls.
    #[must_use]
    pub const fn new(interval: u32) -> Self {
        Self {
            reload: interval,
            count: interval,
            control: 0,
            default_reload: interval,
        }
    }

    /// Whether the timer is counting.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.control & TIMER_ENABLE != 0
    }
}

impl Peripheral for Timer {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn reset(&mut self) -> Result<(), PeripheralError> {
        *self = Self::new(self.default_reload);
        Ok(())
    }

    fn read(&mut self, offset: u32) -> u32 {
        match offset & !0x3 {
            TIMER_REG_COUNT => self.count,
            TIMER_REG_CONTROL => self.control,
            _ => 0,
        }
    }

    fn write(&mut self, offset: u32, value: u32, _width: AccessWidth) {
        match offset & !0x3 {
            TIMER_REG_COUNT => {
                self.reload = value;
                self.count = value;
            }
            TIMER_REG_CONTROL => self.control = value & TIMER_ENABLE,
            _ => {}
        }
    }

    fn tick(&mut self) -> u32 {
        if !self.enabled() || self.reload == 0 {
            return 0;
        }
        self.count = self.count.saturating_sub(1);
        if self.count == 0 {
            self.count = self.reload;
            IRQ_TIMER
        } else {
            0
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_timer_never_fires() {
        let mut timer = Timer::new(1);
        assert_eq!(timer.tick(), 0);
        assert_eq!(timer.read(TIMER_REG_COUNT), 1);
    }

    #[test]
    fn fires_every_interval_and_reloads() {
        let mut timer = Timer::new(100);
        timer.write(TIMER_REG_COUNT, 3, AccessWidth::Word);
        timer.write(TIMER_REG_CONTROL, TIMER_ENABLE, AccessWidth::Word);
        let fired: Vec<u32> = (0..6).map(|_| timer.tick()).collect();
        assert_eq!(fired, [0, 0, IRQ_TIMER, 0, 0, IRQ_TIMER]);
        assert_eq!(timer.read(TIMER_REG_COUNT), 3);
    }

    #[test]
    fn reset_restores_configured_interval() {
        let mut timer = Timer::new(50);
        timer.write(TIMER_REG_COUNT, 7, AccessWidth::Word);
        timer.reset().expect("timer reset");
        assert_eq!(timer.read(TIMER_REG_COUNT), 50);
        assert!(!timer.enabled());
    }
}
