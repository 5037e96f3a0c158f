//! Circular doubly linked list over pooled cells
//!
//! The ring has no terminal node: `head.prev` is always the logical tail,
//! which is what makes append, prepend, and the scheduler's bump-to-back
//! all O(1) without a separate tail pointer. Cells live in a shared
//! [`NodePool`]; the list itself only stores the anchor index, a length,
//! and a modification counter that invalidates in-flight cursors.

use super::node_pool::{ListId, Node, NodePool, NodeRef, NIL};
use core::fmt;
use core::marker::PhantomData;

/// Contract violations of list operations.
///
/// None of these are recoverable runtime states: they flag an integration
/// bug in the caller and abort the operation before the ring is corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    /// The node handle belongs to a different list.
    ForeignNode,
    /// The node handle outlived its pooled cell.
    StaleHandle,
    /// A cursor observed a structural mutation of the list.
    Invalidated { expected: u64, actual: u64 },
    /// Destination slice cannot hold the list contents.
    InsufficientSpace { needed: usize, available: usize },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignNode => write!(f, "node does not belong to this list"),
            Self::StaleHandle => write!(f, "node handle refers to a recycled cell"),
            Self::Invalidated { expected, actual } => {
                write!(f, "list mutated during enumeration: version {} != {}", actual, expected)
            }
            Self::InsufficientSpace { needed, available } => {
                write!(f, "destination too small: need {}, have {}", needed, available)
            }
        }
    }
}

/// Doubly linked circular list. All storage lives in the [`NodePool`]
/// passed to each operation.
#[derive(Debug)]
pub struct LinkedList<T> {
    id: ListId,
    head: u32,
    len: usize,
    version: u64,
    marker: PhantomData<T>,
}

impl<T> LinkedList<T> {
    pub fn new(pool: &mut NodePool<T>) -> Self {
        Self {
            id: pool.register_list(),
            head: NIL,
            len: 0,
            version: 0,
            marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Anchor of the ring; the logical first element.
    pub fn first(&self, pool: &NodePool<T>) -> Option<NodeRef> {
        self.make_ref(pool, self.head)
    }

    /// Logical last element: `head.prev`.
    pub fn last(&self, pool: &NodePool<T>) -> Option<NodeRef> {
        if self.head == NIL {
            None
        } else {
            self.make_ref(pool, pool.node(self.head).prev)
        }
    }

    /// Value of the first element.
    pub fn front<'a>(&self, pool: &'a NodePool<T>) -> Option<&'a T> {
        if self.head == NIL {
            None
        } else {
            pool.node(self.head).value.as_ref()
        }
    }

    /// Inserts `value` as the new head.
    pub fn push_front(&mut self, pool: &mut NodePool<T>, value: T) -> NodeRef {
        let node = pool.acquire(self.id, value);
        if self.head == NIL {
            self.link_single(pool, node.index);
        } else {
            self.link_before(pool, self.head, node.index);
            self.head = node.index;
        }
        node
    }

    /// Inserts `value` as the new tail (before the head in ring order).
    pub fn push_back(&mut self, pool: &mut NodePool<T>, value: T) -> NodeRef {
        let node = pool.acquire(self.id, value);
        if self.head == NIL {
            self.link_single(pool, node.index);
        } else {
            self.link_before(pool, self.head, node.index);
        }
        node
    }

    /// Inserts `value` immediately before `node` in traversal order.
    /// If `node` was the head, the new node becomes the head.
    pub fn insert_before(
        &mut self,
        pool: &mut NodePool<T>,
        node: NodeRef,
        value: T,
    ) -> Result<NodeRef, ListError> {
        let at = self.check(pool, node)?;
        let new = pool.acquire(self.id, value);
        self.link_before(pool, at, new.index);
        if at == self.head {
            self.head = new.index;
        }
        Ok(new)
    }

    /// Unlinks `node` in O(1) using only its own links and recycles the
    /// cell. Re-anchors the head if the removed node was the head.
    pub fn remove(&mut self, pool: &mut NodePool<T>, node: NodeRef) -> Result<T, ListError> {
        let index = self.check(pool, node)?;
        let (next, prev) = {
            let slot = pool.node(index);
            (slot.next, slot.prev)
        };

        if next == index {
            // Single-node ring.
            self.head = NIL;
        } else {
            pool.node_mut(prev).next = next;
            pool.node_mut(next).prev = prev;
            if self.head == index {
                self.head = next;
            }
        }

        self.len -= 1;
        self.version = self.version.wrapping_add(1);
        pool.release(node).ok_or(ListError::StaleHandle)
    }

    /// O(n) removal by value, for callers without a cached node handle.
    pub fn remove_value(&mut self, pool: &mut NodePool<T>, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.find(pool, value) {
            Some(node) => self.remove(pool, node).is_ok(),
            None => false,
        }
    }

    /// Linear scan from the head; first match by value equality.
    pub fn find(&self, pool: &NodePool<T>, value: &T) -> Option<NodeRef>
    where
        T: PartialEq,
    {
        if self.head == NIL {
            return None;
        }
        let mut index = self.head;
        loop {
            let slot = pool.node(index);
            if slot.value.as_ref() == Some(value) {
                return self.make_ref(pool, index);
            }
            index = slot.next;
            if index == self.head {
                return None;
            }
        }
    }

    pub fn contains(&self, pool: &NodePool<T>, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.find(pool, value).is_some()
    }

    /// Value held by `node`, if the handle is live and owned by this list.
    pub fn value<'a>(&self, pool: &'a NodePool<T>, node: NodeRef) -> Option<&'a T> {
        let slot = pool.get(node)?;
        if slot.owner != Some(self.id) {
            return None;
        }
        slot.value.as_ref()
    }

    /// Successor of `node`, or `None` once the ring wraps back to the head.
    pub fn next(&self, pool: &NodePool<T>, node: NodeRef) -> Option<NodeRef> {
        let slot = pool.get(node)?;
        if slot.owner != Some(self.id) || slot.next == self.head {
            return None;
        }
        self.make_ref(pool, slot.next)
    }

    /// Predecessor of `node`, or `None` for the head itself.
    pub fn prev(&self, pool: &NodePool<T>, node: NodeRef) -> Option<NodeRef> {
        let slot = pool.get(node)?;
        if slot.owner != Some(self.id) || node.index == self.head {
            return None;
        }
        self.make_ref(pool, slot.prev)
    }

    /// Lazy forward enumeration. Each call starts a fresh session.
    pub fn iter<'a>(&'a self, pool: &'a NodePool<T>) -> Iter<'a, T> {
        Iter {
            pool,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Starts a restartable enumeration session that survives as long as
    /// the list is not structurally mutated.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            list: self.id,
            version: self.version,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Clones the contents into `dst` starting at `at`, in traversal order.
    pub fn copy_to(&self, pool: &NodePool<T>, dst: &mut [T], at: usize) -> Result<(), ListError>
    where
        T: Clone,
    {
        let available = dst.len().saturating_sub(at);
        if available < self.len {
            return Err(ListError::InsufficientSpace {
                needed: self.len,
                available,
            });
        }
        if self.len == 0 {
            return Ok(());
        }
        for (slot, value) in dst[at..].iter_mut().zip(self.iter(pool)) {
            *slot = value.clone();
        }
        Ok(())
    }

    /// Unlinks and recycles every cell. O(n).
    pub fn clear(&mut self, pool: &mut NodePool<T>) {
        let mut index = self.head;
        for _ in 0..self.len {
            let next = pool.node(index).next;
            let generation = pool.node(index).generation;
            pool.release(NodeRef { index, generation });
            index = next;
        }
        self.head = NIL;
        self.len = 0;
        self.version = self.version.wrapping_add(1);
    }

    fn make_ref(&self, pool: &NodePool<T>, index: u32) -> Option<NodeRef> {
        if index == NIL {
            None
        } else {
            Some(NodeRef {
                index,
                generation: pool.node(index).generation,
            })
        }
    }

    /// Fail-fast ownership check: the handle must be live and belong here.
    fn check(&self, pool: &NodePool<T>, node: NodeRef) -> Result<u32, ListError> {
        let slot = pool.get(node).ok_or(ListError::StaleHandle)?;
        if slot.owner != Some(self.id) {
            return Err(ListError::ForeignNode);
        }
        Ok(node.index)
    }

    fn link_single(&mut self, pool: &mut NodePool<T>, index: u32) {
        let slot = pool.node_mut(index);
        slot.next = index;
        slot.prev = index;
        self.head = index;
        self.len += 1;
        self.version = self.version.wrapping_add(1);
    }

    fn link_before(&mut self, pool: &mut NodePool<T>, at: u32, index: u32) {
        let prev = pool.node(at).prev;
        {
            let slot = pool.node_mut(index);
            slot.next = at;
            slot.prev = prev;
        }
        pool.node_mut(prev).next = index;
        pool.node_mut(at).prev = index;
        self.len += 1;
        self.version = self.version.wrapping_add(1);
    }
}

/// Borrow-checked forward iterator over list values.
pub struct Iter<'a, T> {
    pool: &'a NodePool<T>,
    next: u32,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot: &Node<T> = self.pool.node(self.next);
        self.next = slot.next;
        self.remaining -= 1;
        slot.value.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

/// Detached enumeration session. Unlike [`Iter`] it does not borrow the
/// list, so callers interleaving lookups can hold one across calls; in
/// exchange every step revalidates the modification counter and fails
/// once the list has been structurally mutated.
#[derive(Debug, Clone)]
pub struct Cursor {
    list: ListId,
    version: u64,
    next: u32,
    remaining: usize,
}

impl Cursor {
    pub fn next<'a, T>(
        &mut self,
        list: &LinkedList<T>,
        pool: &'a NodePool<T>,
    ) -> Result<Option<&'a T>, ListError> {
        if self.list != list.id {
            return Err(ListError::ForeignNode);
        }
        if self.version != list.version {
            return Err(ListError::Invalidated {
                expected: self.version,
                actual: list.version,
            });
        }
        if self.remaining == 0 {
            return Ok(None);
        }
        let slot = pool.node(self.next);
        self.next = slot.next;
        self.remaining -= 1;
        Ok(slot.value.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn collect(list: &LinkedList<u32>, pool: &NodePool<u32>) -> Vec<u32> {
        list.iter(pool).copied().collect()
    }

    #[test]
    fn push_back_preserves_insertion_order() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        list.push_back(&mut pool, 1);
        list.push_back(&mut pool, 2);
        list.push_back(&mut pool, 3);

        assert_eq!(collect(&list, &pool), [1, 2, 3]);
        assert_eq!(list.front(&pool), Some(&1));
    }

    #[test]
    fn push_front_becomes_new_head() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        list.push_back(&mut pool, 2);
        list.push_front(&mut pool, 1);

        assert_eq!(collect(&list, &pool), [1, 2]);
    }

    #[test]
    fn insert_before_head_re_anchors() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        let head = list.push_back(&mut pool, 2);
        list.push_back(&mut pool, 3);
        let new = list.insert_before(&mut pool, head, 1).unwrap();

        assert_eq!(list.first(&pool), Some(new));
        assert_eq!(collect(&list, &pool), [1, 2, 3]);
    }

    #[test]
    fn insert_before_mid_node() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        list.push_back(&mut pool, 1);
        let mid = list.push_back(&mut pool, 3);
        list.insert_before(&mut pool, mid, 2).unwrap();

        assert_eq!(collect(&list, &pool), [1, 2, 3]);
    }

    #[test]
    fn ring_integrity_forward_and_backward() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        for i in 0..5 {
            list.push_back(&mut pool, i);
        }
        let second = list.next(&pool, list.first(&pool).unwrap()).unwrap();
        list.remove(&mut pool, second).unwrap();
        list.push_front(&mut pool, 9);

        // Forward walk returns to the head after exactly len steps.
        let head = list.first(&pool).unwrap();
        let mut index = head;
        let mut forward = Vec::new();
        for _ in 0..list.len() {
            forward.push(*list.value(&pool, index).unwrap());
            index = match list.next(&pool, index) {
                Some(next) => next,
                None => head,
            };
        }
        assert_eq!(index, head);

        // Backward walk from the tail yields the exact reverse.
        let mut backward = Vec::new();
        let mut index = list.last(&pool).unwrap();
        for _ in 0..list.len() {
            backward.push(*list.value(&pool, index).unwrap());
            index = match list.prev(&pool, index) {
                Some(prev) => prev,
                None => list.last(&pool).unwrap(),
            };
        }
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(forward, collect(&list, &pool));
    }

    #[test]
    fn remove_head_re_anchors() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        let head = list.push_back(&mut pool, 1);
        list.push_back(&mut pool, 2);

        assert_eq!(list.remove(&mut pool, head), Ok(1));
        assert_eq!(list.front(&pool), Some(&2));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_last_node_empties_list() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        let only = list.push_back(&mut pool, 1);
        assert_eq!(list.remove(&mut pool, only), Ok(1));
        assert!(list.is_empty());
        assert_eq!(list.first(&pool), None);
    }

    #[test]
    fn remove_recycles_into_pool() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        let node = list.push_back(&mut pool, 1);
        let index = node.index();
        list.remove(&mut pool, node).unwrap();

        let next = list.push_back(&mut pool, 2);
        assert_eq!(next.index(), index);
    }

    #[test]
    fn foreign_node_is_rejected() {
        let mut pool = NodePool::new();
        let mut a = LinkedList::new(&mut pool);
        let mut b = LinkedList::new(&mut pool);

        let node = a.push_back(&mut pool, 1);
        assert_eq!(b.remove(&mut pool, node), Err(ListError::ForeignNode));
        assert_eq!(b.insert_before(&mut pool, node, 2).unwrap_err(), ListError::ForeignNode);
        // The failed operations did not disturb either list.
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        let node = list.push_back(&mut pool, 1);
        list.remove(&mut pool, node).unwrap();
        assert_eq!(list.remove(&mut pool, node), Err(ListError::StaleHandle));
    }

    #[test]
    fn find_and_remove_by_value() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        for i in [1, 2, 3, 2] {
            list.push_back(&mut pool, i);
        }

        let node = list.find(&pool, &2).unwrap();
        assert_eq!(list.value(&pool, node), Some(&2));
        assert!(list.contains(&pool, &3));
        assert!(!list.contains(&pool, &9));

        // Removes only the first match.
        assert!(list.remove_value(&mut pool, &2));
        assert_eq!(collect(&list, &pool), [1, 3, 2]);
        assert!(!list.remove_value(&mut pool, &9));
    }

    #[test]
    fn enumeration_is_restartable() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        for i in 0..3 {
            list.push_back(&mut pool, i);
        }

        let first: Vec<u32> = list.iter(&pool).copied().collect();
        let second: Vec<u32> = list.iter(&pool).copied().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn cursor_fails_after_mutation() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        list.push_back(&mut pool, 1);
        list.push_back(&mut pool, 2);

        let mut cursor = list.cursor();
        assert_eq!(cursor.next(&list, &pool), Ok(Some(&1)));

        list.push_back(&mut pool, 3);
        assert!(matches!(
            cursor.next(&list, &pool),
            Err(ListError::Invalidated { .. })
        ));

        // A fresh session sees the new contents.
        let mut cursor = list.cursor();
        assert_eq!(cursor.next(&list, &pool), Ok(Some(&1)));
        assert_eq!(cursor.next(&list, &pool), Ok(Some(&2)));
        assert_eq!(cursor.next(&list, &pool), Ok(Some(&3)));
        assert_eq!(cursor.next(&list, &pool), Ok(None));

        // A session from one list cannot be replayed against another.
        let other: LinkedList<i32> = LinkedList::new(&mut pool);
        let mut cursor = other.cursor();
        assert_eq!(cursor.next(&list, &pool), Err(ListError::ForeignNode));
    }

    #[test]
    fn copy_to_respects_bounds() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        for i in 1..=3 {
            list.push_back(&mut pool, i);
        }

        let mut dst = [0u32; 5];
        list.copy_to(&pool, &mut dst, 1).unwrap();
        assert_eq!(dst, [0, 1, 2, 3, 0]);

        let mut small = [0u32; 2];
        assert_eq!(
            list.copy_to(&pool, &mut small, 0),
            Err(ListError::InsufficientSpace { needed: 3, available: 2 })
        );
    }

    #[test]
    fn clear_recycles_every_cell() {
        let mut pool = NodePool::new();
        let mut list = LinkedList::new(&mut pool);

        for i in 0..10 {
            list.push_back(&mut pool, i);
        }
        let allocated = pool.allocated();
        list.clear(&mut pool);

        assert!(list.is_empty());
        assert_eq!(list.first(&pool), None);
        assert_eq!(pool.recyclable(), allocated);

        // List remains usable after clearing.
        list.push_back(&mut pool, 1);
        assert_eq!(collect(&list, &pool), [1]);
    }
}
