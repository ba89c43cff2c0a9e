//! A double-ended sequence stored as a doubly linked chain of ring buffers.
//!
//! Each link of the chain is a [`HeapChunk`] of fixed capacity. Pushing onto
//! a full boundary chunk links a fresh chunk in front of (or behind) it;
//! elements are never moved between chunks. Popping from a boundary chunk
//! that has run dry first unlinks and frees it, so emptied chunks linger
//! only until the next removal at that end. The chain always keeps at least
//! one chunk.
//!
//! Locating the element at a global index walks the chain from the head,
//! which costs O(number of chunks).

use core::cmp::Ordering;
use core::fmt::{self, Debug, Formatter};
use core::hash::{Hash, Hasher};
use core::iter::{FromIterator, FusedIterator};
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};

use crate::arena::{NodeArena, NodeId, Slot};
use crate::chunk::HeapChunk;
use crate::storage::Capacity;
use crate::CapacityError;

/// The number of elements per chunk used by [`UnrolledList::new`].
pub const DEFAULT_CHUNK_CAPACITY: usize = 10;

pub(crate) struct Node<T, I: Capacity> {
    chunk: HeapChunk<T, I>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[inline(never)]
#[cold]
#[track_caller]
fn index_out_of_bounds(index: usize, len: usize) -> ! {
    panic!(
        "index out of bounds: the len is {} but the index is {}",
        len, index
    )
}

/// A double-ended sequence stored as a linked chain of fixed-capacity ring
/// buffers, also known as an unrolled linked list.
///
/// Pushing and popping at either end is O(1) amortized. Indexing walks the
/// chain from the front and is O(n / chunk capacity). The number of chunks
/// is never zero.
///
/// The index type `I` is used for the front offset and element count of each
/// chunk; a narrow type such as `u8` shrinks per-chunk bookkeeping at the cost
/// of limiting the chunk capacity.
///
/// # Examples
/// ```
/// use unrolled::UnrolledList;
///
/// let mut list = UnrolledList::<i32>::with_chunk_capacity(3);
/// list.push_back(2);
/// list.push_back(3);
/// list.push_front(1);
/// list.push_back(4);
///
/// assert_eq!(list.len(), 4);
/// assert_eq!(list.chunk_count(), 2);
/// assert_eq!(list[2], 3);
/// assert_eq!(list.pop_front(), Some(1));
/// assert_eq!(list.pop_back(), Some(4));
/// assert_eq!(list, [2, 3]);
/// ```
pub struct UnrolledList<T, I: Capacity = usize> {
    nodes: NodeArena<Node<T, I>>,
    head: NodeId,
    tail: NodeId,
    chunk_capacity: usize,
}

impl<T> UnrolledList<T> {
    /// Constructs an empty list with [`DEFAULT_CHUNK_CAPACITY`] elements per chunk.
    ///
    /// # Examples
    /// ```
    /// let list = unrolled::UnrolledList::<u32>::new();
    /// assert_eq!(list.len(), 0);
    /// assert_eq!(list.chunk_count(), 1);
    /// assert_eq!(list.chunk_capacity(), 10);
    /// ```
    pub fn new() -> Self {
        Self::with_chunk_capacity(DEFAULT_CHUNK_CAPACITY)
    }
}

impl<T, I: Capacity> UnrolledList<T, I> {
    /// Constructs an empty list whose chunks each hold `chunk_capacity` elements.
    ///
    /// # Panics
    /// Panics if `chunk_capacity` is zero or cannot be represented by `I`.
    #[track_caller]
    pub fn with_chunk_capacity(chunk_capacity: usize) -> Self {
        let mut nodes = NodeArena::new();
        let head = nodes.insert(Node {
            chunk: HeapChunk::with_capacity(chunk_capacity),
            prev: None,
            next: None,
        });

        UnrolledList {
            nodes,
            head,
            tail: head,
            chunk_capacity,
        }
    }

    /// Constructs an empty list whose chunks each hold `chunk_capacity`
    /// elements, or returns [`CapacityError`] if `chunk_capacity` is zero,
    /// cannot be represented by `I`, or the first chunk cannot be allocated.
    ///
    /// # Examples
    /// ```
    /// use unrolled::UnrolledList;
    /// assert!(UnrolledList::<i32, u8>::try_with_chunk_capacity(255).is_ok());
    /// assert!(UnrolledList::<i32, u8>::try_with_chunk_capacity(256).is_err());
    /// assert!(UnrolledList::<i32>::try_with_chunk_capacity(0).is_err());
    /// ```
    pub fn try_with_chunk_capacity(chunk_capacity: usize) -> crate::Result<Self> {
        let chunk = HeapChunk::try_with_capacity(chunk_capacity)?;
        let mut nodes = NodeArena::new();
        let head = nodes
            .try_insert(Node {
                chunk,
                prev: None,
                next: None,
            })
            .map_err(|_| CapacityError)?;

        Ok(UnrolledList {
            nodes,
            head,
            tail: head,
            chunk_capacity,
        })
    }

    /// Returns the number of elements each chunk can hold.
    #[inline]
    pub fn chunk_capacity(&self) -> usize {
        self.chunk_capacity
    }

    /// Returns the number of chunks currently linked into the chain.
    ///
    /// This is at least 1, and may include chunks emptied by removals that
    /// have not been unlinked yet.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of elements in the list.
    ///
    /// This walks the whole chain, summing the length of each chunk.
    pub fn len(&self) -> usize {
        self.chunks().map(|chunk| chunk.len()).sum()
    }

    /// Returns `true` exactly when the list contains zero elements.
    pub fn is_empty(&self) -> bool {
        self.chunks().all(|chunk| chunk.is_empty())
    }

    #[inline]
    fn node(&self, id: NodeId) -> &Node<T, I> {
        self.nodes.get(id)
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T, I> {
        self.nodes.get_mut(id)
    }

    fn link_front(&mut self, id: NodeId) {
        let old_head = self.head;
        self.node_mut(old_head).prev = Some(id);
        self.head = id;
    }

    fn link_back(&mut self, id: NodeId) {
        let old_tail = self.tail;
        self.node_mut(old_tail).next = Some(id);
        self.tail = id;
    }

    /// Prepends an element to the front of the list.
    ///
    /// If the front chunk is full, a new chunk is allocated and linked in
    /// ahead of it. Aborts on allocation failure; see
    /// [`try_push_front`](UnrolledList::try_push_front) for a fallible variant.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// for i in 0..5 {
    ///     list.push_front(i);
    /// }
    /// assert_eq!(list, [4, 3, 2, 1, 0]);
    /// assert_eq!(list.chunk_count(), 3);
    /// ```
    pub fn push_front(&mut self, value: T) {
        let head = self.head;
        let chunk = &mut self.node_mut(head).chunk;
        if !chunk.is_full() {
            chunk.push_front(value);
            return;
        }

        let mut chunk = HeapChunk::with_capacity(self.chunk_capacity);
        chunk.push_front(value);
        let id = self.nodes.insert(Node {
            chunk,
            prev: None,
            next: Some(head),
        });
        self.link_front(id);
    }

    /// Prepends an element to the front of the list, returning `Err(value)`
    /// if a new chunk was needed but could not be allocated.
    ///
    /// On failure the list is left exactly as it was.
    pub fn try_push_front(&mut self, value: T) -> Result<(), T> {
        let head = self.head;
        let chunk = &mut self.node_mut(head).chunk;
        if !chunk.is_full() {
            chunk.push_front(value);
            return Ok(());
        }

        let mut chunk = match HeapChunk::try_with_capacity(self.chunk_capacity) {
            Ok(chunk) => chunk,
            Err(_) => return Err(value),
        };
        chunk.push_front(value);
        let node = Node {
            chunk,
            prev: None,
            next: Some(head),
        };

        match self.nodes.try_insert(node) {
            Ok(id) => {
                self.link_front(id);
                Ok(())
            }
            Err(mut node) => Err(node.chunk.pop_front()),
        }
    }

    /// Appends an element to the back of the list.
    ///
    /// If the back chunk is full, a new chunk is allocated and linked in
    /// behind it. Aborts on allocation failure; see
    /// [`try_push_back`](UnrolledList::try_push_back) for a fallible variant.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(10);
    /// for i in 1..=11 {
    ///     list.push_back(i);
    /// }
    /// assert_eq!(list.len(), 11);
    /// assert_eq!(list.chunk_count(), 2);
    /// ```
    pub fn push_back(&mut self, value: T) {
        let tail = self.tail;
        let chunk = &mut self.node_mut(tail).chunk;
        if !chunk.is_full() {
            chunk.push_back(value);
            return;
        }

        let mut chunk = HeapChunk::with_capacity(self.chunk_capacity);
        chunk.push_back(value);
        let id = self.nodes.insert(Node {
            chunk,
            prev: Some(tail),
            next: None,
        });
        self.link_back(id);
    }

    /// Appends an element to the back of the list, returning `Err(value)`
    /// if a new chunk was needed but could not be allocated.
    ///
    /// On failure the list is left exactly as it was.
    pub fn try_push_back(&mut self, value: T) -> Result<(), T> {
        let tail = self.tail;
        let chunk = &mut self.node_mut(tail).chunk;
        if !chunk.is_full() {
            chunk.push_back(value);
            return Ok(());
        }

        let mut chunk = match HeapChunk::try_with_capacity(self.chunk_capacity) {
            Ok(chunk) => chunk,
            Err(_) => return Err(value),
        };
        chunk.push_back(value);
        let node = Node {
            chunk,
            prev: Some(tail),
            next: None,
        };

        match self.nodes.try_insert(node) {
            Ok(id) => {
                self.link_back(id);
                Ok(())
            }
            Err(mut node) => Err(node.chunk.pop_back()),
        }
    }

    /// Unlinks and frees empty chunks at the front, stopping at the last one.
    fn discard_empty_head(&mut self) {
        while self.nodes.len() > 1 && self.node(self.head).chunk.is_empty() {
            let next = match self.node(self.head).next {
                Some(next) => next,
                None => break,
            };

            drop(self.nodes.remove(self.head));
            self.node_mut(next).prev = None;
            self.head = next;
        }
    }

    /// Unlinks and frees empty chunks at the back, stopping at the last one.
    fn discard_empty_tail(&mut self) {
        while self.nodes.len() > 1 && self.node(self.tail).chunk.is_empty() {
            let prev = match self.node(self.tail).prev {
                Some(prev) => prev,
                None => break,
            };

            drop(self.nodes.remove(self.tail));
            self.node_mut(prev).next = None;
            self.tail = prev;
        }
    }

    /// Removes the first element and returns it, or [`None`] if the list is empty.
    ///
    /// Empty chunks at the front of the chain are freed first. The last
    /// remaining chunk is never freed.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// list.extend([1, 2, 3]);
    /// assert_eq!(list.pop_front(), Some(1));
    /// assert_eq!(list.pop_front(), Some(2));
    /// assert_eq!(list.chunk_count(), 2);
    /// assert_eq!(list.pop_front(), Some(3));
    /// assert_eq!(list.chunk_count(), 1);
    /// assert_eq!(list.pop_front(), None);
    /// ```
    pub fn pop_front(&mut self) -> Option<T> {
        self.discard_empty_head();
        let head = self.head;
        self.node_mut(head).chunk.try_pop_front()
    }

    /// Removes the last element and returns it, or [`None`] if the list is empty.
    ///
    /// Empty chunks at the back of the chain are freed first. The last
    /// remaining chunk is never freed.
    pub fn pop_back(&mut self) -> Option<T> {
        self.discard_empty_tail();
        let tail = self.tail;
        self.node_mut(tail).chunk.try_pop_back()
    }

    /// Finds the first chunk holding any elements, walking from the head.
    fn first_occupied(&self) -> Option<NodeId> {
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            let node = self.node(id);
            if !node.chunk.is_empty() {
                return Some(id);
            }
            cursor = node.next;
        }
        None
    }

    /// Finds the last chunk holding any elements, walking from the tail.
    fn last_occupied(&self) -> Option<NodeId> {
        let mut cursor = Some(self.tail);
        while let Some(id) = cursor {
            let node = self.node(id);
            if !node.chunk.is_empty() {
                return Some(id);
            }
            cursor = node.prev;
        }
        None
    }

    /// Returns a reference to the first element, or [`None`] if the list is empty.
    ///
    /// A drained chunk still linked at the front is skipped, not freed.
    pub fn front(&self) -> Option<&T> {
        let id = self.first_occupied()?;
        self.node(id).chunk.front()
    }

    /// Returns a mutable reference to the first element, or [`None`] if the list is empty.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        let id = self.first_occupied()?;
        self.node_mut(id).chunk.front_mut()
    }

    /// Returns a reference to the last element, or [`None`] if the list is empty.
    ///
    /// A drained chunk still linked at the back is skipped, not freed.
    pub fn back(&self) -> Option<&T> {
        let id = self.last_occupied()?;
        self.node(id).chunk.back()
    }

    /// Returns a mutable reference to the last element, or [`None`] if the list is empty.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        let id = self.last_occupied()?;
        self.node_mut(id).chunk.back_mut()
    }

    /// Translates a global index into the chunk holding it and the offset
    /// within that chunk.
    fn locate(&self, index: usize) -> Option<(NodeId, I)> {
        let mut remaining = index;
        let mut cursor = Some(self.head);
        while let Some(id) = cursor {
            let node = self.node(id);
            let len = node.chunk.len();
            if remaining < len {
                return Some((id, I::from_usize(remaining)));
            }
            remaining -= len;
            cursor = node.next;
        }
        None
    }

    /// Returns a reference to the element at the given index, or [`None`] if
    /// the index is out of bounds.
    ///
    /// The element at index 0 is the front of the list.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(10);
    /// list.extend(1..=25);
    /// assert_eq!(list.get(12), Some(&13));
    /// assert_eq!(list.get(25), None);
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        let (id, offset) = self.locate(index)?;
        self.node(id).chunk.get(offset)
    }

    /// Returns a mutable reference to the element at the given index, or
    /// [`None`] if the index is out of bounds.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let (id, offset) = self.locate(index)?;
        self.node_mut(id).chunk.get_mut(offset)
    }

    /// Places an element at position `index` within the list, returning the
    /// element previously stored there.
    ///
    /// # Panics
    /// Panics if `index` is greater than or equal to the list's length.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// list.extend([1, 2, 4]);
    /// assert_eq!(list.replace(2, 3), 4);
    /// assert_eq!(list, [1, 2, 3]);
    /// ```
    #[track_caller]
    pub fn replace(&mut self, index: usize, value: T) -> T {
        match self.locate(index) {
            Some((id, offset)) => self.node_mut(id).chunk.replace(offset, value),
            None => index_out_of_bounds(index, self.len()),
        }
    }

    /// Overwrites the element at position `index`, dropping the old value.
    ///
    /// # Panics
    /// Panics if `index` is greater than or equal to the list's length.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: T) {
        self.replace(index, value);
    }

    /// Returns `true` if the list contains an element equal to the given value.
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|item| item == x)
    }

    /// Removes all elements, keeping only the first chunk allocated.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// list.extend(0..7);
    /// list.clear();
    /// assert!(list.is_empty());
    /// assert_eq!(list.chunk_count(), 1);
    /// ```
    pub fn clear(&mut self) {
        let head = self.head;
        let mut cursor = self.node(head).next;
        while let Some(id) = cursor {
            cursor = self.nodes.remove(id).next;
        }

        let node = self.node_mut(head);
        node.next = None;
        node.chunk.clear();
        self.tail = head;
    }

    /// Returns a front-to-back iterator over the chunks of the chain.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(10);
    /// list.extend(1..=25);
    /// let lens: Vec<usize> = list.chunks().map(|chunk| chunk.len()).collect();
    /// assert_eq!(lens, [10, 10, 5]);
    /// ```
    pub fn chunks(&self) -> Chunks<'_, T, I> {
        Chunks {
            nodes: &self.nodes,
            front: Some(self.head),
            back: Some(self.tail),
            remaining: self.nodes.len(),
        }
    }

    fn chunks_mut(&mut self) -> ChunksMut<'_, T, I> {
        ChunksMut {
            slots: self.nodes.slots_mut_ptr(),
            front: Some(self.head),
            back: Some(self.tail),
            remaining: self.nodes.len(),
            _ref: PhantomData,
        }
    }

    /// Returns a front-to-back iterator.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// list.push_back(5);
    /// list.push_back(3);
    /// list.push_back(4);
    /// let b: &[_] = &[&5, &3, &4];
    /// let c: Vec<&i32> = list.iter().collect();
    /// assert_eq!(&c[..], b);
    /// ```
    pub fn iter(&self) -> Iter<'_, T, I> {
        Iter {
            inner: self.chunks().flatten(),
            len: self.len(),
        }
    }

    /// Returns a front-to-back iterator that returns mutable references.
    ///
    /// # Examples
    /// ```
    /// let mut list = unrolled::UnrolledList::<i32>::with_chunk_capacity(2);
    /// list.extend([5, 3, 4]);
    /// for num in list.iter_mut() {
    ///     *num = *num - 2;
    /// }
    /// assert_eq!(list, [3, 1, 2]);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, T, I> {
        let len = self.len();
        IterMut {
            inner: self.chunks_mut().flatten(),
            len,
        }
    }
}

impl<T> Default for UnrolledList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, I: Capacity> Clone for UnrolledList<T, I> {
    fn clone(&self) -> Self {
        let mut result = Self::with_chunk_capacity(self.chunk_capacity);
        result.extend(self.iter().cloned());
        result
    }

    fn clone_from(&mut self, source: &Self) {
        if self.chunk_capacity != source.chunk_capacity {
            *self = source.clone();
            return;
        }

        self.clear();
        self.extend(source.iter().cloned());
    }
}

impl<T, I: Capacity> Index<usize> for UnrolledList<T, I> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, index: usize) -> &T {
        match self.locate(index) {
            Some((id, offset)) => &self.node(id).chunk[offset],
            None => index_out_of_bounds(index, self.len()),
        }
    }
}

impl<T, I: Capacity> IndexMut<usize> for UnrolledList<T, I> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.locate(index) {
            Some((id, offset)) => &mut self.node_mut(id).chunk[offset],
            None => index_out_of_bounds(index, self.len()),
        }
    }
}

impl<T: Debug, I: Capacity> Debug for UnrolledList<T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Hash, I: Capacity> Hash for UnrolledList<T, I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        self.iter().for_each(|item| item.hash(state));
    }
}

impl<AT, AI, BT, BI> PartialEq<UnrolledList<BT, BI>> for UnrolledList<AT, AI>
where
    AT: PartialEq<BT>,
    AI: Capacity,
    BI: Capacity,
{
    fn eq(&self, other: &UnrolledList<BT, BI>) -> bool {
        let mut lhs = self.chunks().flatten();
        let mut rhs = other.chunks().flatten();
        loop {
            match (lhs.next(), rhs.next()) {
                (Some(a), Some(b)) if a == b => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl<T: Eq, I: Capacity> Eq for UnrolledList<T, I> {}

impl<T: PartialEq, I: Capacity, R: AsRef<[T]>> PartialEq<R> for UnrolledList<T, I> {
    fn eq(&self, other: &R) -> bool {
        let mut rhs = other.as_ref().iter();
        let mut lhs = self.chunks().flatten();
        loop {
            match (lhs.next(), rhs.next()) {
                (Some(a), Some(b)) if a == b => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl<T, AI, BI> PartialOrd<UnrolledList<T, BI>> for UnrolledList<T, AI>
where
    T: PartialOrd,
    AI: Capacity,
    BI: Capacity,
{
    fn partial_cmp(&self, other: &UnrolledList<T, BI>) -> Option<Ordering> {
        self.chunks().flatten().partial_cmp(other.chunks().flatten())
    }
}

impl<T: Ord, I: Capacity> Ord for UnrolledList<T, I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chunks().flatten().cmp(other.chunks().flatten())
    }
}

impl<T, I: Capacity> Extend<T> for UnrolledList<T, I> {
    fn extend<It: IntoIterator<Item = T>>(&mut self, iter: It) {
        iter.into_iter().for_each(|item| self.push_back(item));
    }
}

impl<'a, T: 'a + Clone, I: Capacity> Extend<&'a T> for UnrolledList<T, I> {
    fn extend<It: IntoIterator<Item = &'a T>>(&mut self, iter: It) {
        iter.into_iter().for_each(|item| self.push_back(item.clone()));
    }
}

impl<T> FromIterator<T> for UnrolledList<T> {
    fn from_iter<It: IntoIterator<Item = T>>(iter: It) -> Self {
        let mut result = Self::new();
        result.extend(iter);
        result
    }
}

/// An iterator over the chunks of a list.
///
/// This `struct` is created by the [`chunks`](UnrolledList::chunks) method on
/// [`UnrolledList`].
pub struct Chunks<'a, T, I: Capacity> {
    nodes: &'a NodeArena<Node<T, I>>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<T, I: Capacity> Clone for Chunks<'_, T, I> {
    fn clone(&self) -> Self {
        Chunks {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<T, I: Capacity> Debug for Chunks<'_, T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunks")
            .field("remaining", &self.remaining)
            .finish()
    }
}

impl<'a, T, I: Capacity> Iterator for Chunks<'a, T, I> {
    type Item = &'a HeapChunk<T, I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.nodes.get(self.front?);
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.chunk)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, I: Capacity> DoubleEndedIterator for Chunks<'a, T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.nodes.get(self.back?);
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.chunk)
    }
}

impl<T, I: Capacity> ExactSizeIterator for Chunks<'_, T, I> {}
impl<T, I: Capacity> FusedIterator for Chunks<'_, T, I> {}

/// Hands out each chunk of the chain at most once, so the mutable borrows
/// it produces never overlap.
struct ChunksMut<'a, T, I: Capacity> {
    slots: *mut Slot<Node<T, I>>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
    _ref: PhantomData<&'a mut Node<T, I>>,
}

unsafe impl<T: Send, I: Capacity + Send> Send for ChunksMut<'_, T, I> {}
unsafe impl<T: Sync, I: Capacity + Sync> Sync for ChunksMut<'_, T, I> {}

impl<'a, T, I: Capacity> ChunksMut<'a, T, I> {
    fn take(&mut self, id: NodeId) -> Option<&'a mut Node<T, I>> {
        // the arena is mutably borrowed for 'a and every id is visited once
        unsafe { (*NodeArena::slot_at(self.slots, id)).occupied_mut() }
    }
}

impl<'a, T, I: Capacity> Iterator for ChunksMut<'a, T, I> {
    type Item = &'a mut HeapChunk<T, I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.take(self.front?)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&mut node.chunk)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, I: Capacity> DoubleEndedIterator for ChunksMut<'a, T, I> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let node = self.take(self.back?)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&mut node.chunk)
    }
}

/// An iterator over the elements of a list.
///
/// This `struct` is created by the [`iter`](UnrolledList::iter) method on
/// [`UnrolledList`]. See its documentation for more.
pub struct Iter<'a, T, I: Capacity> {
    inner: core::iter::Flatten<Chunks<'a, T, I>>,
    len: usize,
}

impl<T, I: Capacity> Clone for Iter<'_, T, I> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
            len: self.len,
        }
    }
}

impl<T: Debug, I: Capacity> Debug for Iter<'_, T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<'a, T, I: Capacity> Iterator for Iter<'a, T, I> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        let item = self.inner.next()?;
        self.len -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T, I: Capacity> DoubleEndedIterator for Iter<'a, T, I> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        let item = self.inner.next_back()?;
        self.len -= 1;
        Some(item)
    }
}

impl<T, I: Capacity> ExactSizeIterator for Iter<'_, T, I> {}
impl<T, I: Capacity> FusedIterator for Iter<'_, T, I> {}

/// A mutable iterator over the elements of a list.
///
/// This `struct` is created by the [`iter_mut`](UnrolledList::iter_mut) method
/// on [`UnrolledList`]. See its documentation for more.
pub struct IterMut<'a, T, I: Capacity> {
    inner: core::iter::Flatten<ChunksMut<'a, T, I>>,
    len: usize,
}

impl<T, I: Capacity> Debug for IterMut<'_, T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("len", &self.len).finish()
    }
}

impl<'a, T, I: Capacity> Iterator for IterMut<'a, T, I> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        let item = self.inner.next()?;
        self.len -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T, I: Capacity> DoubleEndedIterator for IterMut<'a, T, I> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        let item = self.inner.next_back()?;
        self.len -= 1;
        Some(item)
    }
}

impl<T, I: Capacity> ExactSizeIterator for IterMut<'_, T, I> {}
impl<T, I: Capacity> FusedIterator for IterMut<'_, T, I> {}

/// An owning iterator over the elements of a list.
///
/// This `struct` is created by the [`into_iter`](UnrolledList::into_iter)
/// method on [`UnrolledList`] (provided by the `IntoIterator` trait).
pub struct IntoIter<T, I: Capacity> {
    inner: UnrolledList<T, I>,
    len: usize,
}

impl<T: Debug, I: Capacity> Debug for IntoIter<T, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.inner).finish()
    }
}

impl<T, I: Capacity> Iterator for IntoIter<T, I> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        let item = self.inner.pop_front()?;
        self.len -= 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T, I: Capacity> DoubleEndedIterator for IntoIter<T, I> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        let item = self.inner.pop_back()?;
        self.len -= 1;
        Some(item)
    }
}

impl<T, I: Capacity> ExactSizeIterator for IntoIter<T, I> {}
impl<T, I: Capacity> FusedIterator for IntoIter<T, I> {}

impl<T, I: Capacity> IntoIterator for UnrolledList<T, I> {
    type Item = T;
    type IntoIter = IntoIter<T, I>;

    /// Converts the list into a front-to-back iterator yielding elements by value.
    fn into_iter(self) -> IntoIter<T, I> {
        let len = self.len();
        IntoIter { inner: self, len }
    }
}

impl<'a, T, I: Capacity> IntoIterator for &'a UnrolledList<T, I> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, I>;

    fn into_iter(self) -> Iter<'a, T, I> {
        self.iter()
    }
}

impl<'a, T, I: Capacity> IntoIterator for &'a mut UnrolledList<T, I> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, I>;

    fn into_iter(self) -> IterMut<'a, T, I> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::VecDeque;
    use alloc::vec::Vec;
    use core::cell::Cell;

    fn chunk_lens<T, I: Capacity>(list: &UnrolledList<T, I>) -> Vec<usize> {
        list.chunks().map(|chunk| chunk.len()).collect()
    }

    #[test]
    fn push_back_then_pop_front_is_fifo() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(3);
        for i in 0..20 {
            list.push_back(i);
        }
        for i in 0..20 {
            assert_eq!(list.pop_front(), Some(i));
        }
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn push_front_then_pop_front_is_lifo() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(3);
        for i in 0..20 {
            list.push_front(i);
        }
        for i in (0..20).rev() {
            assert_eq!(list.pop_front(), Some(i));
        }
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn indices_ignore_chunk_boundaries() {
        let mut list = UnrolledList::<i32>::with_chunk_capacity(4);
        let mut expected = VecDeque::new();
        for i in 0..15 {
            if i % 3 == 0 {
                list.push_front(i);
                expected.push_front(i);
            } else {
                list.push_back(i);
                expected.push_back(i);
            }
        }

        assert_eq!(list.len(), expected.len());
        for (i, x) in expected.iter().enumerate() {
            assert_eq!(list.get(i), Some(x));
            assert_eq!(list[i], *x);
        }
        assert_eq!(list.get(expected.len()), None);
    }

    #[test]
    fn overflowing_a_chunk_links_exactly_one_more() {
        let mut list = UnrolledList::<u32>::new();
        for i in 0..DEFAULT_CHUNK_CAPACITY as u32 {
            list.push_back(i);
        }
        assert_eq!(list.chunk_count(), 1);

        list.push_back(10);
        assert_eq!(list.chunk_count(), 2);
        assert_eq!(list.len(), DEFAULT_CHUNK_CAPACITY + 1);
        assert_eq!(chunk_lens(&list), [10, 1]);
    }

    #[test]
    fn twenty_five_elements_span_three_chunks() {
        let mut list = UnrolledList::<u32>::new();
        list.extend(1..=25);
        assert_eq!(list.len(), 25);
        assert_eq!(chunk_lens(&list), [10, 10, 5]);
        assert_eq!(list.get(12), Some(&13));

        for i in 1..=10 {
            assert_eq!(list.pop_front(), Some(i));
        }
        assert_eq!(list.len(), 15);
        // the drained head is unlinked by the next removal at the front
        assert_eq!(chunk_lens(&list), [0, 10, 5]);
        assert_eq!(list.front(), Some(&11));

        assert_eq!(list.pop_front(), Some(11));
        assert_eq!(chunk_lens(&list), [9, 5]);
        assert_eq!(list.len(), 14);
    }

    #[test]
    fn drained_tail_is_freed_by_the_next_pop_back() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(2);
        list.extend(0..5);
        assert_eq!(chunk_lens(&list), [2, 2, 1]);

        let mut len = list.len();
        while let Some(_) = list.pop_back() {
            len -= 1;
            assert_eq!(list.len(), len);
        }

        assert_eq!(list.chunk_count(), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn sole_chunk_survives_being_emptied() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(2);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
        assert_eq!(list.chunk_count(), 1);

        list.push_back(1);
        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.chunk_count(), 1);

        list.push_front(2);
        assert_eq!(list, [2]);
    }

    #[test]
    fn boundary_peeks_skip_drained_chunks() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(2);
        list.extend(0..6);
        list.pop_front();
        list.pop_front();
        list.pop_back();
        list.pop_back();
        assert_eq!(chunk_lens(&list), [0, 2, 0]);

        assert_eq!(list.front(), Some(&2));
        assert_eq!(list.back(), Some(&3));
        *list.front_mut().unwrap() = 20;
        *list.back_mut().unwrap() = 30;
        assert_eq!(list, [20, 30]);
        assert_eq!(list.chunk_count(), 3);

        // a drained boundary chunk takes new elements before a chunk is added
        list.push_front(1);
        list.push_back(4);
        assert_eq!(chunk_lens(&list), [1, 2, 1]);
        assert_eq!(list, [1, 20, 30, 4]);
    }

    #[test]
    fn len_is_stable_without_mutation() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(3);
        list.extend(0..8);
        assert_eq!(list.len(), list.len());
        assert_eq!(list.iter().len(), 8);
    }

    #[test]
    fn set_and_replace_reach_every_chunk() {
        let mut list = UnrolledList::<i32>::with_chunk_capacity(3);
        list.extend(0..9);
        for i in 0..9 {
            list.set(i, -(i as i32));
        }
        assert_eq!(list.replace(4, 100), -4);
        list[8] = 80;
        *list.get_mut(0).unwrap() = 1;
        assert_eq!(list, [1, -1, -2, -3, 100, -5, -6, -7, 80]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds: the len is 3 but the index is 3")]
    fn set_past_the_end_panics() {
        let mut list = UnrolledList::<i32>::with_chunk_capacity(2);
        list.extend(0..3);
        list.set(3, 0);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn index_past_the_end_panics() {
        let list = UnrolledList::<i32>::with_chunk_capacity(2);
        let _value = list[0];
    }

    #[test]
    #[should_panic(expected = "chunk capacity must be non-zero")]
    fn zero_chunk_capacity_panics() {
        let _ = UnrolledList::<i32>::with_chunk_capacity(0);
    }

    #[test]
    fn fallible_pushes_behave_like_infallible_ones() {
        let mut list = UnrolledList::<i32>::try_with_chunk_capacity(2).unwrap();
        for i in 0..5 {
            assert_eq!(list.try_push_back(i), Ok(()));
            assert_eq!(list.try_push_front(-i), Ok(()));
        }
        assert_eq!(list, [-4, -3, -2, -1, 0, 0, 1, 2, 3, 4]);
        assert_eq!(chunk_lens(&list), [2, 2, 2, 2, 2]);
    }

    #[test]
    fn iterators_meet_in_the_middle() {
        let mut list = UnrolledList::<i32>::with_chunk_capacity(3);
        list.extend(0..10);
        list.push_front(-1);

        let mut it = list.iter();
        assert_eq!(it.len(), 11);
        assert_eq!(it.next(), Some(&-1));
        assert_eq!(it.next_back(), Some(&9));
        assert_eq!(it.next_back(), Some(&8));
        assert_eq!(it.len(), 8);
        let rest: Vec<i32> = it.copied().collect();
        assert_eq!(rest, [0, 1, 2, 3, 4, 5, 6, 7]);

        let mut it = list.iter_mut();
        while let (Some(a), Some(b)) = (it.next(), it.next_back()) {
            core::mem::swap(a, b);
        }
        assert_eq!(list, [9, 8, 7, 6, 5, 4, 3, 2, 1, 0, -1]);

        let owned: Vec<i32> = list.into_iter().rev().collect();
        assert_eq!(owned, [-1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn equality_and_hash_ignore_chunk_layout() {
        use core::hash::{Hash, Hasher};
        use rustc_hash::FxHasher;

        fn fx_hash<T: Hash>(value: &T) -> u64 {
            let mut hasher = FxHasher::default();
            value.hash(&mut hasher);
            hasher.finish()
        }

        let mut a = UnrolledList::<u16>::with_chunk_capacity(2);
        a.extend(0..7);
        let mut b = UnrolledList::<u16, u8>::with_chunk_capacity(5);
        for i in (0..7).rev() {
            b.push_front(i);
        }
        let mut c = UnrolledList::<u16>::with_chunk_capacity(5);
        c.extend(&[0, 1, 2, 3, 4, 5, 6]);

        assert_ne!(chunk_lens(&a), chunk_lens(&b));
        assert!(a == b);
        assert_eq!(a, c);
        assert_eq!(fx_hash(&a), fx_hash(&c));

        c.push_back(7);
        assert_ne!(a, c);
        assert!(a < c);
        assert_ne!(fx_hash(&a), fx_hash(&c));
    }

    #[test]
    fn clone_and_debug() {
        let mut list = UnrolledList::<i32>::with_chunk_capacity(2);
        list.extend(1..=3);
        let copy = list.clone();
        assert_eq!(copy.chunk_capacity(), 2);
        assert_eq!(copy, list);
        assert_eq!(alloc::format!("{:?}", list), "[1, 2, 3]");
        assert_eq!(alloc::format!("{:?}", list.iter()), "[1, 2, 3]");

        let mut target = UnrolledList::<i32>::with_chunk_capacity(2);
        target.extend(0..9);
        target.clone_from(&list);
        assert_eq!(target, [1, 2, 3]);
        assert_eq!(target.chunk_count(), 2);

        let collected: UnrolledList<i32> = (0..4).collect();
        assert!(collected.contains(&3));
        assert!(!collected.contains(&4));
    }

    #[test]
    fn clone_from_adopts_source_chunk_capacity() {
        let mut source = UnrolledList::<i32>::with_chunk_capacity(4);
        source.extend(0..9);

        let mut target = UnrolledList::<i32>::with_chunk_capacity(2);
        target.extend(0..3);
        target.clone_from(&source);

        let expected = source.clone();
        assert_eq!(target.chunk_capacity(), expected.chunk_capacity());
        assert_eq!(chunk_lens(&target), chunk_lens(&expected));
        assert_eq!(chunk_lens(&target), [4, 4, 1]);
        assert_eq!(target, source);
    }

    #[test]
    #[should_panic(expected = "cannot be fully indexed by type u8")]
    fn chunk_capacity_beyond_index_type_panics() {
        let _ = UnrolledList::<i32, u8>::with_chunk_capacity(256);
    }

    #[test]
    fn churn_reuses_freed_chunk_slots() {
        let mut list = UnrolledList::<u32>::with_chunk_capacity(2);
        for round in 0..50 {
            list.extend(0..6);
            while list.pop_front().is_some() {}
            assert_eq!(list.chunk_count(), 1, "round {}", round);
        }
    }

    struct Droppable<'a> {
        counter: &'a Cell<usize>,
    }

    impl Drop for Droppable<'_> {
        fn drop(&mut self) {
            self.counter.set(self.counter.get() + 1);
        }
    }

    #[test]
    fn teardown_drops_every_element_once() {
        let drop_count = Cell::new(0);
        let mut list = UnrolledList::<Droppable>::with_chunk_capacity(3);
        for _ in 0..7 {
            list.push_back(Droppable { counter: &drop_count });
            list.push_front(Droppable { counter: &drop_count });
        }

        drop(list.pop_front());
        drop(list.pop_back());
        assert_eq!(drop_count.get(), 2);

        drop(list);
        assert_eq!(drop_count.get(), 14);

        let drop_count = Cell::new(0);
        let mut list = UnrolledList::<Droppable>::with_chunk_capacity(3);
        for _ in 0..10 {
            list.push_back(Droppable { counter: &drop_count });
        }
        list.clear();
        assert_eq!(drop_count.get(), 10);
        assert_eq!(list.chunk_count(), 1);
        assert!(list.is_empty());

        list.push_back(Droppable { counter: &drop_count });
        let mut it = list.into_iter();
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert_eq!(drop_count.get(), 11);
    }

    #[test]
    fn matches_vec_deque_under_random_operations() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(0x5432_1012_3454_3210);
        for &capacity in &[1usize, 2, 3, 7] {
            let mut list = UnrolledList::<u32, u8>::with_chunk_capacity(capacity);
            let mut model = VecDeque::new();

            for _ in 0..4000 {
                match rng.gen_range(0..7) {
                    0 | 1 => {
                        let x = rng.gen();
                        list.push_back(x);
                        model.push_back(x);
                    }
                    2 | 3 => {
                        let x = rng.gen();
                        list.push_front(x);
                        model.push_front(x);
                    }
                    4 => assert_eq!(list.pop_front(), model.pop_front()),
                    5 => assert_eq!(list.pop_back(), model.pop_back()),
                    _ => {
                        if !model.is_empty() {
                            let i = rng.gen_range(0..model.len());
                            let x = rng.gen();
                            list.set(i, x);
                            model[i] = x;
                        }
                    }
                }

                assert_eq!(list.len(), model.len());
                assert_eq!(list.front(), model.front());
                assert_eq!(list.back(), model.back());

                // drained chunks only ever linger at the two ends
                let lens = chunk_lens(&list);
                assert!(!lens.is_empty());
                if lens.len() > 2 {
                    assert!(lens[1..lens.len() - 1].iter().all(|&len| len > 0));
                }
            }

            assert!(list.iter().eq(model.iter()));
            assert!(list.iter().rev().eq(model.iter().rev()));
        }
    }
}
