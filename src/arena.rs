//! Slot storage for the nodes of a chain, addressed by stable handles.
//!
//! Vacated slots are threaded onto a free list and reused before the
//! backing vector grows, so a chain that repeatedly drops and re-creates
//! boundary nodes does not leak slots.

use alloc::vec::Vec;

/// A stable reference to a node stored in a [`NodeArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

pub(crate) enum Slot<N> {
    Occupied(N),
    Vacant { next_free: Option<NodeId> },
}

impl<N> Slot<N> {
    #[inline]
    pub(crate) fn occupied_mut(&mut self) -> Option<&mut N> {
        match self {
            Slot::Occupied(node) => Some(node),
            Slot::Vacant { .. } => None,
        }
    }
}

#[inline(never)]
#[cold]
#[track_caller]
fn stale_handle(id: NodeId) -> ! {
    panic!("node handle {:?} does not refer to an occupied slot", id)
}

pub(crate) struct NodeArena<N> {
    slots: Vec<Slot<N>>,
    next_free: Option<NodeId>,
    len: usize,
}

impl<N> NodeArena<N> {
    pub(crate) const fn new() -> Self {
        NodeArena {
            slots: Vec::new(),
            next_free: None,
            len: 0,
        }
    }

    /// Returns the number of occupied slots.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stores `node`, allocating a new slot only if the free list is empty.
    pub(crate) fn insert(&mut self, node: N) -> NodeId {
        match self.next_free {
            Some(id) => self.occupy(id, node),
            None => self.push(node),
        }
    }

    /// Stores `node`, handing it back if a new slot cannot be allocated.
    pub(crate) fn try_insert(&mut self, node: N) -> Result<NodeId, N> {
        match self.next_free {
            Some(id) => Ok(self.occupy(id, node)),
            None => {
                if self.slots.try_reserve(1).is_err() {
                    return Err(node);
                }
                Ok(self.push(node))
            }
        }
    }

    fn push(&mut self, node: N) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot::Occupied(node));
        self.len += 1;
        id
    }

    fn occupy(&mut self, id: NodeId, node: N) -> NodeId {
        let slot = &mut self.slots[id.0];
        match slot {
            Slot::Vacant { next_free } => self.next_free = *next_free,
            Slot::Occupied(_) => stale_handle(id),
        }
        *slot = Slot::Occupied(node);
        self.len += 1;
        id
    }

    /// Removes the node at `id` and returns it, putting the slot on the free list.
    #[track_caller]
    pub(crate) fn remove(&mut self, id: NodeId) -> N {
        let vacant = Slot::Vacant {
            next_free: self.next_free,
        };
        match core::mem::replace(&mut self.slots[id.0], vacant) {
            Slot::Occupied(node) => {
                self.next_free = Some(id);
                self.len -= 1;
                node
            }
            Slot::Vacant { .. } => stale_handle(id),
        }
    }

    #[inline]
    #[track_caller]
    pub(crate) fn get(&self, id: NodeId) -> &N {
        match &self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => stale_handle(id),
        }
    }

    #[inline]
    #[track_caller]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut N {
        match self.slots[id.0].occupied_mut() {
            Some(node) => node,
            None => stale_handle(id),
        }
    }

    /// Returns a raw pointer to the first slot.
    ///
    /// Used by iterators that hand out disjoint mutable borrows of
    /// individual nodes; the pointer is invalidated by any insertion.
    #[inline]
    pub(crate) fn slots_mut_ptr(&mut self) -> *mut Slot<N> {
        self.slots.as_mut_ptr()
    }

    /// Returns a raw pointer to the slot at `id`, derived from `base`.
    ///
    /// # Safety
    /// `base` must come from [`slots_mut_ptr`](NodeArena::slots_mut_ptr) on
    /// an arena that has not been mutated since, and `id` must be a handle
    /// issued by that arena.
    #[inline]
    pub(crate) unsafe fn slot_at(base: *mut Slot<N>, id: NodeId) -> *mut Slot<N> {
        base.add(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacated_slots_are_reused() {
        let mut arena = NodeArena::new();
        let a = arena.insert('a');
        let b = arena.insert('b');
        let c = arena.insert('c');
        assert_eq!(arena.len(), 3);

        assert_eq!(arena.remove(b), 'b');
        assert_eq!(arena.remove(a), 'a');
        assert_eq!(arena.len(), 1);

        let d = arena.insert('d');
        let e = arena.try_insert('e').unwrap();
        assert_eq!(d, a);
        assert_eq!(e, b);
        assert_eq!(arena.slots.len(), 3);

        *arena.get_mut(c) = 'C';
        assert_eq!(*arena.get(c), 'C');
        assert_eq!(*arena.get(d), 'd');
        assert_eq!(*arena.get(e), 'e');
    }

    #[test]
    #[should_panic(expected = "does not refer to an occupied slot")]
    fn removed_handle_is_stale() {
        let mut arena = NodeArena::new();
        let a = arena.insert(1u32);
        arena.remove(a);
        arena.get(a);
    }
}
