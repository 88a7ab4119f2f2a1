// Cooperative tick scheduler and wake/sleep primitives
// Single core, no preemption, no priorities. WFI idles the CPU between
// timer interrupts.
//
// The timer ISR calls Scheduler::tick() to age every task; the main loop
// calls Scheduler::poll() to run whatever became due. Repeating tasks
// live forever, one-shot tasks retire after their first firing.

mod list;

pub mod scheduler;
pub mod task;
pub mod tick;
pub mod wake;

pub use scheduler::{Error, Scheduler};
pub use task::{Callback, Context, Listener, Schedule, TaskId};
pub use tick::{DEFAULT_TICK_MS, TickConfig, TickSource};
