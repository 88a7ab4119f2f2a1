// Tick source binding
// The hardware timer is a collaborator: it only has to call
// Scheduler::tick() from its interrupt at a fixed rate. Periods are
// given in ms and counted in ticks.

/// Default timer interrupt interval (ms)
pub const DEFAULT_TICK_MS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    /// Milliseconds between two timer interrupts.
    pub tick_ms: u32,
}

impl TickConfig {
    pub const fn new(tick_ms: u32) -> Self {
        Self { tick_ms }
    }

    /// Ticks needed for `period_ms` to elapse, rounded up so a task never
    /// fires early. Zero stays zero (fires on every tick).
    pub const fn ticks_for(&self, period_ms: u32) -> u32 {
        if self.tick_ms <= 1 {
            return period_ms;
        }
        period_ms.div_ceil(self.tick_ms)
    }

    pub const fn rate_hz(&self) -> u32 {
        if self.tick_ms == 0 {
            return 0;
        }
        1000 / self.tick_ms
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_MS)
    }
}

/// A periodic timer able to drive the scheduler.
///
/// `start` programs the hardware to interrupt every `tick_ms` and arms the
/// interrupt; the interrupt handler is expected to call
/// [`Scheduler::tick`](super::Scheduler::tick).
pub trait TickSource {
    type Error: core::fmt::Debug;

    fn start(&mut self, tick_ms: u32) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ms_tick_is_identity() {
        let cfg = TickConfig::default();
        assert_eq!(cfg.ticks_for(0), 0);
        assert_eq!(cfg.ticks_for(3), 3);
        assert_eq!(cfg.ticks_for(1000), 1000);
        assert_eq!(cfg.rate_hz(), 1000);
    }

    #[test]
    fn coarse_tick_rounds_up() {
        let cfg = TickConfig::new(10);
        assert_eq!(cfg.ticks_for(0), 0);
        assert_eq!(cfg.ticks_for(1), 1);
        assert_eq!(cfg.ticks_for(10), 1);
        assert_eq!(cfg.ticks_for(25), 3);
        assert_eq!(cfg.rate_hz(), 100);
    }
}
