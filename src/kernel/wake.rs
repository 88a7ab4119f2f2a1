// Wake flag signaling between the tick ISR and the main loop
//
// The ISR raises DUE when its sweep made at least one task due; the
// main loop consumes it via try_wake() and only polls then, sleeping
// (WFI) otherwise. Uptime is kept in ticks under a critical section
// (riscv32imc has no atomic RMW).

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, Ordering};

static WAKE_DUE: AtomicBool = AtomicBool::new(false);

static UPTIME_TICKS: critical_section::Mutex<Cell<u32>> =
    critical_section::Mutex::new(Cell::new(0));

/// Called from the tick ISR on every interrupt; `due` is what
/// [`Scheduler::tick`](super::Scheduler::tick) returned.
#[inline]
pub fn signal_tick(due: bool) {
    if due {
        WAKE_DUE.store(true, Ordering::Release);
    }
    critical_section::with(|cs| {
        let ticks = UPTIME_TICKS.borrow(cs);
        ticks.set(ticks.get().wrapping_add(1));
    });
}

/// Consume the wake flag. True if something became due since last call.
pub fn try_wake() -> bool {
    critical_section::with(|_| {
        let due = WAKE_DUE.load(Ordering::Relaxed);
        if due {
            WAKE_DUE.store(false, Ordering::Relaxed);
        }
        due
    })
}

pub fn uptime_ticks() -> u32 {
    critical_section::with(|cs| UPTIME_TICKS.borrow(cs).get())
}

#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv32")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }

    #[cfg(all(not(target_arch = "riscv32"), test))]
    {
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // statics are shared by the whole test binary; keep this the only test
    #[test]
    fn flags_and_uptime() {
        let start = uptime_ticks();

        signal_tick(false);
        assert!(!try_wake());

        signal_tick(true);
        assert!(try_wake());
        assert!(!try_wake(), "flag is consumed");

        assert_eq!(uptime_ticks().wrapping_sub(start), 2);
        wait_for_interrupt();
    }
}
