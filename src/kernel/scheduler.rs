// Flat cooperative tick scheduler
// NOTE: No dynamic allocation; the arena holds at most N tasks.
//
// tick() runs in the timer ISR, poll() in the main loop. Every touch of
// the arena happens inside a critical section; listeners and callbacks
// run outside it so they may create tasks.
use core::cell::{Cell, RefCell};
use core::fmt;

use critical_section::Mutex;
use log::{debug, info, warn};

use super::list::TaskList;
use super::task::{Callback, Context, Listener, Schedule, Task, TaskId};
use super::tick::{TickConfig, TickSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Every slot of the arena is occupied
    Full,
    /// init() was already called
    AlreadyStarted,
    /// Tick interval of 0 ms
    InvalidTickRate,
    /// The tick source refused to start
    TimerStart,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Full => write!(f, "task arena full"),
            Error::AlreadyStarted => write!(f, "tick source already started"),
            Error::InvalidTickRate => write!(f, "tick interval must be at least 1 ms"),
            Error::TimerStart => write!(f, "tick source failed to start"),
        }
    }
}

// what poll() found at the cursor
enum Step<const N: usize> {
    Skip(Option<TaskId>),
    Due(Option<Listener<N>>, Schedule),
}

pub struct Scheduler<const N: usize> {
    tasks: Mutex<RefCell<TaskList<N>>>,
    // task whose listener is running, if any
    current: Mutex<Cell<Option<TaskId>>>,
    started: Mutex<Cell<bool>>,
    config: TickConfig,
}

impl<const N: usize> Scheduler<N> {
    pub const fn new(config: TickConfig) -> Self {
        Self {
            tasks: Mutex::new(RefCell::new(TaskList::new())),
            current: Mutex::new(Cell::new(None)),
            started: Mutex::new(Cell::new(false)),
            config,
        }
    }

    pub const fn config(&self) -> TickConfig {
        self.config
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    fn with<R>(&self, f: impl FnOnce(&mut TaskList<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut *self.tasks.borrow_ref_mut(cs)))
    }

    /// Start the tick source at the configured rate.
    pub fn init<S: TickSource>(&self, source: &mut S) -> Result<(), Error> {
        if self.config.tick_ms == 0 {
            return Err(Error::InvalidTickRate);
        }
        if critical_section::with(|cs| self.started.borrow(cs).replace(true)) {
            return Err(Error::AlreadyStarted);
        }

        if let Err(e) = source.start(self.config.tick_ms) {
            warn!("sched: tick source start failed: {:?}", e);
            critical_section::with(|cs| self.started.borrow(cs).set(false));
            return Err(Error::TimerStart);
        }

        info!(
            "sched: tick every {}ms ({} Hz)",
            self.config.tick_ms,
            self.config.rate_hz()
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        critical_section::with(|cs| self.started.borrow(cs).get())
    }

    /// Timer interrupt body: advance every task by one tick and flag the
    /// ones whose period elapsed. Returns true if any task became due.
    pub fn tick(&self) -> bool {
        self.with(|list| {
            let mut due = false;
            list.for_each_mut(|task| due |= task.advance());
            due
        })
    }

    /// Dispatch every due task once, in insertion order.
    ///
    /// Repeating tasks get their listener called and their due flag
    /// cleared. One-shot tasks get listener then callback, then leave the
    /// arena. Returns how many tasks were dispatched.
    pub fn poll(&self) -> usize {
        let mut dispatched = 0;
        let mut prev: Option<TaskId> = None;
        let mut cursor = self.with(|list| list.head());

        while let Some(id) = cursor {
            let step = self.with(|list| match list.get(id) {
                Some(task) if task.due => Step::Due(task.listener, task.schedule),
                _ => Step::Skip(list.next_of(id)),
            });

            let (listener, schedule) = match step {
                Step::Skip(next) => {
                    prev = Some(id);
                    cursor = next;
                    continue;
                }
                Step::Due(listener, schedule) => (listener, schedule),
            };
            dispatched += 1;

            if let Some(listener) = listener {
                let outer =
                    critical_section::with(|cs| self.current.borrow(cs).replace(Some(id)));
                let mut ctx = Context::new(self, id);
                listener(&mut ctx);
                critical_section::with(|cs| self.current.borrow(cs).set(outer));
            }

            match schedule {
                Schedule::Repeating => {
                    cursor = self.with(|list| {
                        if let Some(task) = list.get_mut(id) {
                            task.due = false;
                        }
                        list.next_of(id)
                    });
                    prev = Some(id);
                }
                Schedule::OneShot => {
                    // read after the listener: it may have handed the callback on
                    let callback =
                        self.with(|list| list.get_mut(id).and_then(|t| t.callback.take()));
                    if let Some(callback) = callback {
                        callback();
                    }

                    // next is read last, the listener may have appended behind us
                    cursor = self.with(|list| {
                        let next = list.next_of(id);
                        list.remove(prev, id);
                        next
                    });
                    debug!("sched: task {} retired", id);
                }
            }
        }

        dispatched
    }

    /// Append a new task at the tail.
    ///
    /// Called while a listener runs, the new task takes over the dispatched
    /// task's completion callback (see [`Context::create`]). Outside of a
    /// dispatch nothing is inherited.
    pub fn create(
        &self,
        period_ms: u32,
        schedule: Schedule,
        listener: Option<Listener<N>>,
        callback: Option<Callback>,
    ) -> Result<TaskId, Error> {
        self.insert(period_ms, schedule, listener, callback, self.current())
    }

    /// The task whose listener is running, if any.
    pub fn current(&self) -> Option<TaskId> {
        critical_section::with(|cs| self.current.borrow(cs).get())
    }

    pub(crate) fn insert(
        &self,
        period_ms: u32,
        schedule: Schedule,
        listener: Option<Listener<N>>,
        callback: Option<Callback>,
        current: Option<TaskId>,
    ) -> Result<TaskId, Error> {
        let task = Task::new(self.config.ticks_for(period_ms), schedule, listener, callback);

        let created = self.with(|list| {
            let id = list.push(task)?;
            let inherited = current
                .and_then(|cur| list.get_mut(cur))
                .and_then(|cur| cur.callback.take());
            if let (Some(callback), Some(task)) = (inherited, list.get_mut(id)) {
                task.callback = Some(callback);
            }
            Some((id, inherited.and(current)))
        });

        let Some((id, parent)) = created else {
            warn!("sched: arena full ({} tasks), {} task dropped", N, schedule);
            return Err(Error::Full);
        };

        debug!("sched: task {} created, {} every {}ms", id, schedule, period_ms);
        if let Some(parent) = parent {
            debug!("sched: task {} inherits callback of {}", id, parent);
        }
        Ok(id)
    }

    /// Number of tasks in the arena (walks the links).
    pub fn size(&self) -> usize {
        self.with(|list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with(|list| list.is_empty())
    }

    /// Whether `id` still names a live task. False once a one-shot retired.
    pub fn contains(&self, id: TaskId) -> bool {
        self.with(|list| list.get(id).is_some())
    }

    /// Whether `id` is flagged due and waiting for the next poll.
    pub fn is_due(&self, id: TaskId) -> bool {
        self.with(|list| list.get(id).is_some_and(|t| t.due))
    }
}

impl<const N: usize> Default for Scheduler<N> {
    fn default() -> Self {
        Self::new(TickConfig::default())
    }
}
