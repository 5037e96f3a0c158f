//! Thread entity as seen by the ready queues
//!
//! The full thread state machine lives with the external scheduler; the
//! ready-queue core only consumes the fields below. Mutable fields use
//! atomics so a `KThread` can be shared as `Arc<KThread>` across the
//! emulated cores; all accesses are `Relaxed` because every mutation runs
//! under the scheduler's single coarse lock.

use crate::libutils::collections::NodeRef;
use crate::scheduler::{CPU_CORES_COUNT, INVALID_CORE};
use alloc::boxed::Box;
use core::array;
use core::sync::atomic::{AtomicI32, AtomicU64, Ordering};

/// Thread ID type
pub type ThreadId = u64;

/// Packed "no cached node" sibling slot.
const NO_NODE: u64 = u64::MAX;

fn pack(node: Option<NodeRef>) -> u64 {
    match node {
        Some(node) => ((node.index as u64) << 32) | node.generation as u64,
        None => NO_NODE,
    }
}

fn unpack(raw: u64) -> Option<NodeRef> {
    if raw == NO_NODE {
        None
    } else {
        Some(NodeRef {
            index: (raw >> 32) as u32,
            generation: raw as u32,
        })
    }
}

/// Guest thread handle consumed by [`KPriorityQueue`].
///
/// [`KPriorityQueue`]: crate::scheduler::KPriorityQueue
#[derive(Debug)]
pub struct KThread {
    /// Unique thread ID
    id: ThreadId,

    /// Thread name (for debugging)
    name: Box<str>,

    /// Core the thread is currently assigned to; negative = unassigned
    active_core: AtomicI32,

    /// Effective priority after inheritance; may lag the queue bucket
    dynamic_priority: AtomicI32,

    /// Cached ready-list node, one slot per core, so the queue can remove
    /// this thread from a specific core's list without searching
    siblings_per_core: [AtomicU64; CPU_CORES_COUNT],
}

impl KThread {
    pub fn new(id: ThreadId, name: &str, priority: i32, core: i32) -> Self {
        Self {
            id,
            name: name.into(),
            active_core: AtomicI32::new(core),
            dynamic_priority: AtomicI32::new(priority),
            siblings_per_core: array::from_fn(|_| AtomicU64::new(NO_NODE)),
        }
    }

    /// Unassigned thread at the given priority.
    pub fn detached(id: ThreadId, name: &str, priority: i32) -> Self {
        Self::new(id, name, priority, INVALID_CORE)
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn active_core(&self) -> i32 {
        self.active_core.load(Ordering::Relaxed)
    }

    pub fn set_active_core(&self, core: i32) {
        self.active_core.store(core, Ordering::Relaxed);
    }

    pub fn dynamic_priority(&self) -> i32 {
        self.dynamic_priority.load(Ordering::Relaxed)
    }

    pub fn set_dynamic_priority(&self, priority: i32) {
        self.dynamic_priority.store(priority, Ordering::Relaxed);
    }

    pub(crate) fn queue_node(&self, core: usize) -> Option<NodeRef> {
        unpack(self.siblings_per_core[core].load(Ordering::Relaxed))
    }

    pub(crate) fn set_queue_node(&self, core: usize, node: Option<NodeRef>) {
        self.siblings_per_core[core].store(pack(node), Ordering::Relaxed);
    }
}

impl PartialEq for KThread {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for KThread {}
