// pulp-tasks firmware entry point (ESP32-C3)
//
// Boot sequence: logger -> timer -> scheduler tasks -> main loop
// Main loop: take wake flag -> poll scheduler -> WFI -> repeat
//
// TIMG0 timer0 interrupts every tick; its handler ages all tasks and
// raises the wake flag when one became due. All task bodies run from
// the main loop, never from the ISR.

#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};

use core::cell::{Cell, RefCell};
use critical_section::Mutex;

use pulp_tasks::kernel::wake::{self, signal_tick, try_wake};
use pulp_tasks::kernel::{Context, DEFAULT_TICK_MS, Schedule, Scheduler, TickConfig, TickSource};

esp_bootloader_esp_idf::esp_app_desc!();

const MAX_TASKS: usize = 16;

const HEARTBEAT_MS: u32 = 1000;
const STEP_MS: u32 = 250;

static SCHED: Scheduler<MAX_TASKS> = Scheduler::new(TickConfig::new(DEFAULT_TICK_MS));

static TIMER0: Mutex<RefCell<Option<PeriodicTimer<'static, esp_hal::Blocking>>>> =
    Mutex::new(RefCell::new(None));

// cs: riscv32imc has no atomic add
static BEATS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

#[esp_hal::handler(priority = esp_hal::interrupt::Priority::Priority1)]
fn timer0_handler() {
    critical_section::with(|cs| {
        if let Some(timer) = TIMER0.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    signal_tick(SCHED.tick());
}

// TIMG0 timer0 as the scheduler's tick source
struct Timer0;

#[derive(Debug)]
enum TimerError {
    /// TIMER0 was never installed
    Missing,
    /// esp-hal rejected the period
    Hal,
}

impl TickSource for Timer0 {
    type Error = TimerError;

    fn start(&mut self, tick_ms: u32) -> Result<(), Self::Error> {
        critical_section::with(|cs| -> Result<(), TimerError> {
            let mut slot = TIMER0.borrow_ref_mut(cs);
            let timer = slot.as_mut().ok_or(TimerError::Missing)?;
            timer
                .start(Duration::from_millis(tick_ms as u64))
                .map_err(|e| {
                    warn!("timer0: start failed: {:?}", e);
                    TimerError::Hal
                })?;
            timer.listen();
            Ok(())
        })
    }
}

fn heartbeat(_ctx: &mut Context<'_, MAX_TASKS>) {
    let beats = critical_section::with(|cs| {
        let beats = BEATS.borrow(cs);
        beats.set(beats.get().wrapping_add(1));
        beats.get()
    });
    info!(
        "heartbeat {} (uptime {} ticks, {} tasks)",
        beats,
        wake::uptime_ticks(),
        SCHED.size()
    );
}

// Three chained one-shots; `sequence_done` rides along to the last one.
fn step_one(ctx: &mut Context<'_, MAX_TASKS>) {
    info!("sequence: step 1 ({})", ctx.task());
    if let Err(e) = ctx.create(STEP_MS, Schedule::OneShot, Some(step_two), None) {
        warn!("sequence: step 2 not scheduled: {}", e);
    }
}

fn step_two(ctx: &mut Context<'_, MAX_TASKS>) {
    info!("sequence: step 2 ({})", ctx.task());
    if let Err(e) = ctx.create(STEP_MS, Schedule::OneShot, Some(step_three), None) {
        warn!("sequence: step 3 not scheduled: {}", e);
    }
}

fn step_three(ctx: &mut Context<'_, MAX_TASKS>) {
    info!("sequence: step 3 ({})", ctx.task());
}

fn sequence_done() {
    info!("sequence: done");
}

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    info!("booting...");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let mut timer0 = PeriodicTimer::new(timg0.timer0);
    critical_section::with(|cs| {
        timer0.set_interrupt_handler(timer0_handler);
        TIMER0.borrow_ref_mut(cs).replace(timer0);
    });

    if let Err(e) = SCHED.create(HEARTBEAT_MS, Schedule::Repeating, Some(heartbeat), None) {
        warn!("heartbeat not scheduled: {}", e);
    }
    if let Err(e) = SCHED.create(
        STEP_MS,
        Schedule::OneShot,
        Some(step_one),
        Some(sequence_done),
    ) {
        warn!("sequence not scheduled: {}", e);
    }

    if let Err(e) = SCHED.init(&mut Timer0) {
        panic!("tick source: {}", e);
    }
    info!(
        "scheduler ready, {} tasks, {}ms tick.",
        SCHED.size(),
        SCHED.config().tick_ms
    );

    loop {
        if try_wake() {
            SCHED.poll();
        }
        wake::wait_for_interrupt();
    }
}
