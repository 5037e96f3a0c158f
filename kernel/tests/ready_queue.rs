//! End-to-end ready-queue behavior through the public API.
//!
//! The queue is not internally synchronized; as in the emulator, every
//! mutation here runs under one coarse lock.

use horizon_kernel::{KPriorityQueue, KThread, CPU_CORES_COUNT};
use spin::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

fn ids(queue: &KPriorityQueue, core: i32) -> Vec<u64> {
    queue.scheduled_threads(core).map(|t| t.id()).collect()
}

#[test]
fn end_to_end_dispatch_scenario() {
    let mut queue = KPriorityQueue::new();
    let t1 = Arc::new(KThread::new(1, "T1", 10, 0));
    let t2 = Arc::new(KThread::new(2, "T2", 5, 0));
    let t3 = Arc::new(KThread::new(3, "T3", 10, 0));

    queue.schedule(10, 0, &t1);
    queue.schedule(5, 0, &t2);
    queue.schedule(10, 0, &t3);

    // Priority 5 dispatches before 10; FIFO within priority 10.
    assert_eq!(ids(&queue, 0), [2, 1, 3]);
    assert!(queue.has_scheduled_threads(0));
    assert_eq!(queue.scheduled_threads_first(0).unwrap().id(), 2);

    let front = queue.reschedule(10, 0, &t1).unwrap().unwrap();
    assert_eq!(front.id(), 3);
    assert_eq!(ids(&queue, 0), [2, 3, 1]);
}

#[test]
fn migration_between_cores() {
    let mut queue = KPriorityQueue::new();
    let t = Arc::new(KThread::new(7, "worker", 12, 0));

    queue.schedule(12, 0, &t);
    queue.transfer_to_core(12, 1, &t).unwrap();

    assert_eq!(t.active_core(), 1);
    assert_eq!(ids(&queue, 1), [7]);
    assert!(ids(&queue, 0).is_empty());
    let suggested_on_0: Vec<u64> = queue.suggested_threads(0).map(|t| t.id()).collect();
    assert_eq!(suggested_on_0, [7]);
    assert_eq!(queue.suggested_threads(1).count(), 0);
}

#[test]
fn serialized_access_under_coarse_lock() {
    const PER_CORE: u64 = 16;

    let queue = Arc::new(Mutex::new(KPriorityQueue::new()));
    let mut prio_of = HashMap::new();
    let mut workers = Vec::new();

    for core in 0..CPU_CORES_COUNT as u64 {
        for i in 0..PER_CORE {
            prio_of.insert(core * 100 + i, ((i * 7) % 64) as i32);
        }
    }

    for core in 0..CPU_CORES_COUNT as u64 {
        let queue = Arc::clone(&queue);
        let prio_of = prio_of.clone();
        workers.push(std::thread::spawn(move || {
            for i in 0..PER_CORE {
                let id = core * 100 + i;
                let prio = prio_of[&id];
                let thread = Arc::new(KThread::new(id, "w", prio, core as i32));
                queue.lock().schedule(prio, core as i32, &thread);
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let queue = queue.lock();
    for core in 0..CPU_CORES_COUNT as i32 {
        let order = ids(&queue, core);
        assert_eq!(order.len(), PER_CORE as usize);

        // Every thread landed on its own core...
        assert!(order.iter().all(|id| (id / 100) as i32 == core));

        // ...and enumeration is priority-sorted.
        let prios: Vec<i32> = order.iter().map(|id| prio_of[id]).collect();
        let mut sorted = prios.clone();
        sorted.sort_unstable();
        assert_eq!(prios, sorted);
    }
}
