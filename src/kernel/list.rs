// Fixed-capacity task arena with index links
// NOTE: No dynamic allocation. Slots are reused; a per-slot generation
// keeps old TaskIds from naming the new occupant.
//
// Traversal order is insertion order: append at tail, unlink given the
// predecessor the caller already walked past.

use super::task::{Task, TaskId};

struct Slot<const N: usize> {
    task: Option<Task<N>>,
    next: Option<u16>,
    generation: u16,
}

impl<const N: usize> Slot<N> {
    const EMPTY: Self = Self {
        task: None,
        next: None,
        generation: 0,
    };
}

pub(crate) struct TaskList<const N: usize> {
    slots: [Slot<N>; N],
    head: Option<u16>,
    tail: Option<u16>,
}

impl<const N: usize> TaskList<N> {
    pub const fn new() -> Self {
        const { assert!(N <= u16::MAX as usize, "task arena too large") };
        Self {
            slots: [const { Slot::EMPTY }; N],
            head: None,
            tail: None,
        }
    }

    fn id_at(&self, index: u16) -> TaskId {
        TaskId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn live(&self, id: TaskId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|s| s.generation == id.generation && s.task.is_some())
    }

    // append at the tail, None if every slot is taken
    pub fn push(&mut self, task: Task<N>) -> Option<TaskId> {
        let index = self.slots.iter().position(|s| s.task.is_none())? as u16;

        let slot = &mut self.slots[index as usize];
        slot.task = Some(task);
        slot.next = None;

        match self.tail {
            Some(tail) => self.slots[tail as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);

        Some(self.id_at(index))
    }

    pub fn get(&self, id: TaskId) -> Option<&Task<N>> {
        if !self.live(id) {
            return None;
        }
        self.slots[id.index()].task.as_ref()
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task<N>> {
        if !self.live(id) {
            return None;
        }
        self.slots[id.index()].task.as_mut()
    }

    pub fn head(&self) -> Option<TaskId> {
        self.head.map(|i| self.id_at(i))
    }

    pub fn next_of(&self, id: TaskId) -> Option<TaskId> {
        if !self.live(id) {
            return None;
        }
        self.slots[id.index()].next.map(|i| self.id_at(i))
    }

    fn predecessor(&self, index: u16) -> Option<u16> {
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let next = self.slots[i as usize].next;
            if next == Some(index) {
                return Some(i);
            }
            cursor = next;
        }
        None
    }

    /// Unlink `id` and hand back its task. `prev` is the node the caller
    /// visited just before `id` (None at the head); a stale hint costs a walk.
    pub fn remove(&mut self, prev: Option<TaskId>, id: TaskId) -> Option<Task<N>> {
        if !self.live(id) {
            return None;
        }
        let index = id.index;

        let hint = prev.filter(|p| self.live(*p)).map(|p| p.index);
        let linked = match hint {
            Some(p) => self.slots[p as usize].next == Some(index),
            None => self.head == Some(index),
        };
        let prev = if linked {
            hint
        } else if self.head == Some(index) {
            None
        } else {
            Some(self.predecessor(index)?)
        };

        let slot = &mut self.slots[index as usize];
        let next = slot.next.take();
        let task = slot.task.take();
        slot.generation = slot.generation.wrapping_add(1);

        match prev {
            Some(p) => self.slots[p as usize].next = next,
            None => self.head = next,
        }
        if self.tail == Some(index) {
            self.tail = prev;
        }

        task
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut Task<N>)) {
        let mut cursor = self.head;
        while let Some(i) = cursor {
            let slot = &mut self.slots[i as usize];
            if let Some(task) = slot.task.as_mut() {
                f(task);
            }
            cursor = slot.next;
        }
    }

    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut cursor = self.head;
        while let Some(i) = cursor {
            n += 1;
            cursor = self.slots[i as usize].next;
        }
        n
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::task::Schedule;

    fn task(period: u32) -> Task<4> {
        Task::new(period, Schedule::Repeating, None, None)
    }

    fn periods(list: &TaskList<4>) -> std::vec::Vec<u32> {
        let mut out = std::vec::Vec::new();
        let mut cursor = list.head();
        while let Some(id) = cursor {
            out.push(list.get(id).map(|t| t.period_ticks).unwrap());
            cursor = list.next_of(id);
        }
        out
    }

    #[test]
    fn push_keeps_insertion_order() {
        let mut list = TaskList::<4>::new();
        for p in [10, 20, 30] {
            list.push(task(p)).unwrap();
        }
        assert_eq!(periods(&list), [10, 20, 30]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn push_fails_when_full() {
        let mut list = TaskList::<4>::new();
        for p in 0..4 {
            assert!(list.push(task(p)).is_some());
        }
        assert!(list.push(task(99)).is_none());
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_head_middle_tail() {
        let mut list = TaskList::<4>::new();
        let a = list.push(task(1)).unwrap();
        let b = list.push(task(2)).unwrap();
        let c = list.push(task(3)).unwrap();
        let d = list.push(task(4)).unwrap();

        assert_eq!(list.remove(Some(a), b).map(|t| t.period_ticks), Some(2));
        assert_eq!(periods(&list), [1, 3, 4]);

        assert!(list.remove(None, a).is_some());
        assert_eq!(periods(&list), [3, 4]);

        assert!(list.remove(Some(c), d).is_some());
        assert_eq!(periods(&list), [3]);

        // tail moved back, append lands after the survivor
        list.push(task(5)).unwrap();
        assert_eq!(periods(&list), [3, 5]);
    }

    #[test]
    fn remove_with_stale_hint_walks() {
        let mut list = TaskList::<4>::new();
        let a = list.push(task(1)).unwrap();
        let _b = list.push(task(2)).unwrap();
        let c = list.push(task(3)).unwrap();

        // a is not c's predecessor
        assert!(list.remove(Some(a), c).is_some());
        assert_eq!(periods(&list), [1, 2]);
    }

    #[test]
    fn reused_slot_invalidates_old_id() {
        let mut list = TaskList::<4>::new();
        let a = list.push(task(1)).unwrap();
        list.remove(None, a).unwrap();
        let b = list.push(task(2)).unwrap();

        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(list.get(a).is_none());
        assert!(list.remove(None, a).is_none());
        assert_eq!(list.get(b).map(|t| t.period_ticks), Some(2));
    }

    #[test]
    fn empty_list() {
        let mut list = TaskList::<4>::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.head().is_none());
        let mut visited = 0;
        list.for_each_mut(|_| visited += 1);
        assert_eq!(visited, 0);
    }
}
