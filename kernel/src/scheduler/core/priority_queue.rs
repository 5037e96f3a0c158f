//! Per-core, per-priority ready queues
//!
//! The emulated analogue of the guest kernel's multi-level ready-queue
//! array. For every (priority, core) pair there are two FIFO rings:
//! *scheduled* threads are assigned to that core; *suggested* threads could
//! run there but are assigned elsewhere and serve as migration candidates.
//! A per-core `u64` bitmask mirrors which priority levels are non-empty, so
//! dispatch skips straight to the next populated level with one
//! trailing-zeros scan instead of probing all 64.
//!
//! Guest software can observe scheduling order, so insertion positions
//! (FIFO admission, prepend on urgent wake, suggest-at-front) and the
//! lowest-bit-first scan direction must not change.
//!
//! Not internally synchronized: callers serialize every operation under the
//! scheduler's coarse lock. Multi-step operations like `transfer_to_core`
//! must appear atomic to other cores' dispatch loops.

use crate::libutils::collections::{LinkedList, ListError, NodePool, NodeRef};
use crate::scheduler::core::error::{SchedulerError, SchedulerResult};
use crate::scheduler::thread::KThread;
use crate::scheduler::{CPU_CORES_COUNT, PRIORITIES_COUNT};
use alloc::sync::Arc;
use core::array;

type ThreadList = LinkedList<Arc<KThread>>;
type ListGrid = [[ThreadList; CPU_CORES_COUNT]; PRIORITIES_COUNT];

pub struct KPriorityQueue {
    scheduled_threads_per_prio_per_core: ListGrid,
    suggested_threads_per_prio_per_core: ListGrid,

    /// Bit `p` set ⇔ scheduled list (p, core) is non-empty.
    scheduled_priorities_per_core: [u64; CPU_CORES_COUNT],
    suggested_priorities_per_core: [u64; CPU_CORES_COUNT],

    /// Shared cell storage for all ready lists.
    pool: NodePool<Arc<KThread>>,
}

impl KPriorityQueue {
    pub fn new() -> Self {
        let mut pool = NodePool::new();
        let scheduled: ListGrid =
            array::from_fn(|_| array::from_fn(|_| LinkedList::new(&mut pool)));
        let suggested: ListGrid =
            array::from_fn(|_| array::from_fn(|_| LinkedList::new(&mut pool)));
        Self {
            scheduled_threads_per_prio_per_core: scheduled,
            suggested_threads_per_prio_per_core: suggested,
            scheduled_priorities_per_core: [0; CPU_CORES_COUNT],
            suggested_priorities_per_core: [0; CPU_CORES_COUNT],
            pool,
        }
    }

    fn prio_in_range(prio: i32) -> bool {
        (0..PRIORITIES_COUNT as i32).contains(&prio)
    }

    fn core_in_range(core: i32) -> bool {
        (0..CPU_CORES_COUNT as i32).contains(&core)
    }

    /// Appends `thread` to the scheduled list for (prio, core): FIFO
    /// admission behind same-priority peers. Caches the node on the thread
    /// for O(1) removal.
    pub fn schedule(&mut self, prio: i32, core: i32, thread: &Arc<KThread>) {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return;
        }
        let (p, c) = (prio as usize, core as usize);

        let queue = &mut self.scheduled_threads_per_prio_per_core[p][c];
        let node = queue.push_back(&mut self.pool, thread.clone());
        thread.set_queue_node(c, Some(node));
        self.scheduled_priorities_per_core[c] |= 1 << p;
    }

    /// Like [`schedule`](Self::schedule) but inserts ahead of same-priority
    /// peers: the thread becomes immediately eligible (urgent wake).
    pub fn schedule_prepend(&mut self, prio: i32, core: i32, thread: &Arc<KThread>) {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return;
        }
        let (p, c) = (prio as usize, core as usize);

        let queue = &mut self.scheduled_threads_per_prio_per_core[p][c];
        let node = queue.push_front(&mut self.pool, thread.clone());
        thread.set_queue_node(c, Some(node));
        self.scheduled_priorities_per_core[c] |= 1 << p;
    }

    /// Removes `thread` from the scheduled list for (prio, core) in O(1)
    /// via its cached node; clears the bitmask bit when the list empties.
    pub fn unschedule(&mut self, prio: i32, core: i32, thread: &Arc<KThread>) -> SchedulerResult<()> {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return Ok(());
        }
        let (p, c) = (prio as usize, core as usize);

        let node = Self::cached_node(thread, core)?;
        let queue = &mut self.scheduled_threads_per_prio_per_core[p][c];
        queue
            .remove(&mut self.pool, node)
            .map_err(|cause| Self::lift(cause, prio, core))?;
        thread.set_queue_node(c, None);
        if queue.is_empty() {
            self.scheduled_priorities_per_core[c] &= !(1 << p);
        }
        Ok(())
    }

    /// Round-robin bump on time-slice expiry: moves `thread` to the back of
    /// its (prio, core) scheduled list and returns the new front — the
    /// thread that should now be considered for dispatch at that priority.
    pub fn reschedule(
        &mut self,
        prio: i32,
        core: i32,
        thread: &Arc<KThread>,
    ) -> SchedulerResult<Option<Arc<KThread>>> {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return Ok(None);
        }
        let (p, c) = (prio as usize, core as usize);

        let node = Self::cached_node(thread, core)?;
        let queue = &mut self.scheduled_threads_per_prio_per_core[p][c];
        queue
            .remove(&mut self.pool, node)
            .map_err(|cause| Self::lift(cause, prio, core))?;
        let node = queue.push_back(&mut self.pool, thread.clone());
        thread.set_queue_node(c, Some(node));
        Ok(queue.front(&self.pool).cloned())
    }

    /// Marks `thread` as runnable on `core` while assigned elsewhere.
    /// Most recent suggestion goes to the front, matching guest behavior.
    pub fn suggest(&mut self, prio: i32, core: i32, thread: &Arc<KThread>) {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return;
        }
        let (p, c) = (prio as usize, core as usize);

        let queue = &mut self.suggested_threads_per_prio_per_core[p][c];
        let node = queue.push_front(&mut self.pool, thread.clone());
        thread.set_queue_node(c, Some(node));
        self.suggested_priorities_per_core[c] |= 1 << p;
    }

    /// Withdraws a suggestion placed by [`suggest`](Self::suggest).
    pub fn unsuggest(&mut self, prio: i32, core: i32, thread: &Arc<KThread>) -> SchedulerResult<()> {
        if !Self::prio_in_range(prio) || !Self::core_in_range(core) {
            return Ok(());
        }
        let (p, c) = (prio as usize, core as usize);

        let node = Self::cached_node(thread, core)?;
        let queue = &mut self.suggested_threads_per_prio_per_core[p][c];
        queue
            .remove(&mut self.pool, node)
            .map_err(|cause| Self::lift(cause, prio, core))?;
        thread.set_queue_node(c, None);
        if queue.is_empty() {
            self.suggested_priorities_per_core[c] &= !(1 << p);
        }
        Ok(())
    }

    /// Migrates `thread` from its recorded active core to `dst_core`.
    ///
    /// Ordering is load-bearing: unschedule before schedule so the thread is
    /// never double-scheduled, and suggest-on-source last so it is never
    /// suggested on a core it is still scheduled on. A negative core means
    /// "no such core" and skips that half of the operation.
    pub fn transfer_to_core(
        &mut self,
        prio: i32,
        dst_core: i32,
        thread: &Arc<KThread>,
    ) -> SchedulerResult<()> {
        let src_core = thread.active_core();
        if src_core == dst_core {
            return Ok(());
        }

        log::trace!(
            "thread {}: core {} -> core {} (prio {})",
            thread.id(),
            src_core,
            dst_core,
            prio
        );

        thread.set_active_core(dst_core);

        if src_core >= 0 {
            self.unschedule(prio, src_core, thread)?;
        }

        if dst_core >= 0 {
            if Self::core_in_range(dst_core) && thread.queue_node(dst_core as usize).is_some() {
                self.unsuggest(prio, dst_core, thread)?;
            }
            self.schedule(prio, dst_core, thread);
        }

        if src_core >= 0 {
            self.suggest(prio, src_core, thread);
        }

        Ok(())
    }

    /// Scheduled threads of `core` in dispatch order: lowest set priority
    /// bit first, FIFO within each level. Lazy; an invalid core yields an
    /// empty sequence.
    pub fn scheduled_threads(&self, core: i32) -> KThreadIter<'_> {
        self.iter_threads(
            &self.scheduled_threads_per_prio_per_core,
            &self.scheduled_priorities_per_core,
            core,
        )
    }

    /// Suggested threads of `core` in the same priority order.
    pub fn suggested_threads(&self, core: i32) -> KThreadIter<'_> {
        self.iter_threads(
            &self.suggested_threads_per_prio_per_core,
            &self.suggested_priorities_per_core,
            core,
        )
    }

    /// The thread the scheduler should run next on `core`, if any.
    pub fn scheduled_threads_first(&self, core: i32) -> Option<Arc<KThread>> {
        self.scheduled_threads_element_at(core, 0)
    }

    /// The Nth scheduled thread of `core` in dispatch order.
    pub fn scheduled_threads_element_at(&self, core: i32, index: usize) -> Option<Arc<KThread>> {
        self.scheduled_threads(core).nth(index).cloned()
    }

    /// First scheduled thread of `core` whose live dynamic priority matches
    /// exactly (the queue bucket may lag behind inheritance updates).
    pub fn scheduled_threads_with_dynamic_priority_first(
        &self,
        core: i32,
        dynamic_priority: i32,
    ) -> Option<Arc<KThread>> {
        self.scheduled_threads(core)
            .find(|thread| thread.dynamic_priority() == dynamic_priority)
            .cloned()
    }

    /// O(1): true iff any scheduled priority bit is set for `core`.
    pub fn has_scheduled_threads(&self, core: i32) -> bool {
        Self::core_in_range(core) && self.scheduled_priorities_per_core[core as usize] != 0
    }

    fn iter_threads<'a>(
        &'a self,
        lists: &'a ListGrid,
        masks: &'a [u64; CPU_CORES_COUNT],
        core: i32,
    ) -> KThreadIter<'a> {
        let (core, prio_mask) = if Self::core_in_range(core) {
            (core as usize, masks[core as usize])
        } else {
            (0, 0)
        };
        KThreadIter {
            lists,
            pool: &self.pool,
            core,
            prio_mask,
            list: None,
            node: None,
        }
    }

    fn cached_node(thread: &Arc<KThread>, core: i32) -> SchedulerResult<NodeRef> {
        thread
            .queue_node(core as usize)
            .ok_or(SchedulerError::DetachedThread { core })
    }

    fn lift(cause: ListError, prio: i32, core: i32) -> SchedulerError {
        SchedulerError::InvalidNode { prio, core, cause }
    }
}

impl Default for KPriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, priority-ordered walk over one core's scheduled or suggested set.
///
/// Pops the lowest set bit of the priority mask to jump to the next
/// populated level, then follows that level's ring in FIFO order.
pub struct KThreadIter<'a> {
    lists: &'a ListGrid,
    pool: &'a NodePool<Arc<KThread>>,
    core: usize,
    prio_mask: u64,
    list: Option<&'a ThreadList>,
    node: Option<NodeRef>,
}

impl<'a> Iterator for KThreadIter<'a> {
    type Item = &'a Arc<KThread>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let (Some(list), Some(node)) = (self.list, self.node) {
                self.node = list.next(self.pool, node);
                if let Some(value) = list.value(self.pool, node) {
                    return Some(value);
                }
            } else if self.prio_mask != 0 {
                let prio = self.prio_mask.trailing_zeros() as usize;
                self.prio_mask &= !(1u64 << prio);
                let list = &self.lists[prio][self.core];
                self.list = Some(list);
                self.node = list.first(self.pool);
            } else {
                return None;
            }
        }
    }
}
