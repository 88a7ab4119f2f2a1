// Task descriptors and the per-dispatch context handed to listeners
//
// Listeners and callbacks are plain fn pointers (no closures, no alloc).
// A listener receives the Context of its own dispatch. Any task created
// while it runs takes over the one-shot's completion callback, which is
// how a callback is handed down a chain.

use core::fmt;

use super::scheduler::{Error, Scheduler};

/// Invoked every time the task becomes due.
pub type Listener<const N: usize> = fn(&mut Context<'_, N>);

/// Invoked once, when a one-shot task retires.
pub type Callback = fn();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fires every period, forever.
    Repeating,
    /// Fires once, then is removed.
    OneShot,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Repeating => write!(f, "repeating"),
            Schedule::OneShot => write!(f, "one-shot"),
        }
    }
}

/// Handle to a task in the scheduler's arena.
///
/// The generation makes a handle go stale once its slot is reused, so a
/// retired one-shot's id never aliases a newer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub(crate) index: u16,
    pub(crate) generation: u16,
}

impl TaskId {
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    pub const fn generation(&self) -> u16 {
        self.generation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

// Arena payload for one task. Links live in the arena slot, not here.
pub(crate) struct Task<const N: usize> {
    pub period_ticks: u32,
    pub schedule: Schedule,
    pub listener: Option<Listener<N>>,
    pub callback: Option<Callback>,
    pub ticks: u32,
    pub due: bool,
}

impl<const N: usize> Task<N> {
    pub const fn new(
        period_ticks: u32,
        schedule: Schedule,
        listener: Option<Listener<N>>,
        callback: Option<Callback>,
    ) -> Self {
        Self {
            period_ticks,
            schedule,
            listener,
            callback,
            ticks: 0,
            due: false,
        }
    }

    // One timer tick. A due task holds its count until it is dispatched.
    #[inline]
    pub fn advance(&mut self) -> bool {
        if self.due {
            return false;
        }
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks >= self.period_ticks {
            self.ticks = 0;
            self.due = true;
            return true;
        }
        false
    }
}

/// Execution context of one listener invocation.
///
/// Only exists while the scheduler is dispatching `task`, which is also
/// what [`Scheduler::current`] reports for that span.
pub struct Context<'a, const N: usize> {
    scheduler: &'a Scheduler<N>,
    task: TaskId,
}

impl<'a, const N: usize> Context<'a, N> {
    pub(crate) fn new(scheduler: &'a Scheduler<N>, task: TaskId) -> Self {
        Self { scheduler, task }
    }

    /// The task being dispatched.
    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn scheduler(&self) -> &'a Scheduler<N> {
        self.scheduler
    }

    /// Create a task that follows this one.
    ///
    /// If the dispatched task still carries a completion callback, the new
    /// task takes it over (replacing `callback`) and the dispatched task
    /// loses it. The callback then fires when the last task of the chain
    /// retires instead of at the first step.
    pub fn create(
        &mut self,
        period_ms: u32,
        schedule: Schedule,
        listener: Option<Listener<N>>,
        callback: Option<Callback>,
    ) -> Result<TaskId, Error> {
        self.scheduler
            .insert(period_ms, schedule, listener, callback, Some(self.task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_fires_on_period() {
        let mut t: Task<4> = Task::new(3, Schedule::Repeating, None, None);
        assert!(!t.advance());
        assert!(!t.advance());
        assert!(t.advance());
        assert!(t.due);
        assert_eq!(t.ticks, 0);
    }

    #[test]
    fn due_task_holds_count() {
        let mut t: Task<4> = Task::new(2, Schedule::Repeating, None, None);
        t.advance();
        t.advance();
        assert!(t.due);
        for _ in 0..5 {
            assert!(!t.advance());
        }
        assert_eq!(t.ticks, 0);
    }

    #[test]
    fn zero_period_fires_every_tick() {
        let mut t: Task<4> = Task::new(0, Schedule::OneShot, None, None);
        assert!(t.advance());
        t.due = false;
        assert!(t.advance());
    }

    #[test]
    fn task_id_display() {
        let id = TaskId {
            index: 3,
            generation: 7,
        };
        assert_eq!(std::format!("{}", id), "#3.7");
    }
}
