//! A fixed-capacity ring buffer holding one contiguous run of a sequence.
//!
//! A chunk supports O(1) inserts and removals at both of its ends, and O(1)
//! access by offset. It never grows: pushing into a full chunk is a caller
//! bug, and popping from an empty one is as well. The checked `try_*`
//! variants report these conditions instead of panicking.

use core::fmt::{self, Debug, Formatter};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ops::{Index, IndexMut};
use core::slice;

use crate::storage::{
    alloc_block, buffer_too_large_for_index_type, try_alloc_block, Capacity, ContiguousStorage,
    HeapStorage, SliceStorage,
};
use crate::CapacityError;

/// A fixed-capacity ring buffer.
///
/// Logical element `i` lives in slot `(front + i) % capacity`, for all
/// `i < len`. Slots outside that window are uninitialized and never read.
pub struct Chunk<T, S: ContiguousStorage<T>, I: Capacity = usize> {
    front: I,
    len: I,
    buf: S,
    elem: PhantomData<T>,
}

/// A chunk using any mutable slice for storage.
///
/// # Examples
/// ```
/// use core::mem::MaybeUninit;
/// let mut backing_array = [MaybeUninit::<char>::uninit(); 8];
/// let (slice1, slice2) = (&mut backing_array[..]).split_at_mut(4);
/// let chunk1 = unrolled::chunk::SliceChunk::<char>::from(slice1);
/// let chunk2 = unrolled::chunk::SliceChunk::<char>::from(slice2);
/// assert_eq!(chunk1.capacity(), 4);
/// assert_eq!(chunk2.capacity(), 4);
/// ```
pub type SliceChunk<'a, T, I = usize> = Chunk<T, SliceStorage<'a, T>, I>;

/// A chunk owning a heap-allocated slice, as used by
/// [`UnrolledList`](crate::UnrolledList).
///
/// Note that this still has a fixed capacity, and will never reallocate.
pub type HeapChunk<T, I = usize> = Chunk<T, HeapStorage<T>, I>;

#[inline(never)]
#[cold]
#[track_caller]
fn chunk_is_full() -> ! {
    panic!("chunk is already at capacity")
}

#[inline(never)]
#[cold]
#[track_caller]
fn chunk_is_empty() -> ! {
    panic!("chunk is empty")
}

#[inline(never)]
#[cold]
#[track_caller]
fn zero_capacity() -> ! {
    panic!("chunk capacity must be non-zero")
}

#[inline(never)]
#[cold]
#[track_caller]
fn offset_out_of_bounds(offset: usize, len: usize) -> ! {
    panic!(
        "offset out of bounds: the len is {} but the offset is {}",
        len, offset
    )
}

#[inline]
unsafe fn slice_assume_init<T>(slice: &[MaybeUninit<T>]) -> &[T] {
    &*(slice as *const [MaybeUninit<T>] as *const [T])
}

#[inline]
unsafe fn slice_assume_init_mut<T>(slice: &mut [MaybeUninit<T>]) -> &mut [T] {
    &mut *(slice as *mut [MaybeUninit<T>] as *mut [T])
}

impl<T, S: ContiguousStorage<T>, I: Capacity> From<S> for Chunk<T, S, I> {
    /// Converts a contiguous block of memory into an empty chunk.
    ///
    /// # Panics
    /// Panics if the block is empty, or if the index type `I` cannot
    /// represent `buf.capacity()`.
    #[track_caller]
    fn from(buf: S) -> Self {
        if buf.capacity() == 0 {
            zero_capacity();
        }
        if buf.capacity() > I::MAX_REPRESENTABLE {
            buffer_too_large_for_index_type::<I>();
        }

        Chunk {
            front: I::from_usize(0),
            len: I::from_usize(0),
            buf,
            elem: PhantomData,
        }
    }
}

impl<T, I: Capacity> HeapChunk<T, I> {
    /// Allocates an empty chunk with room for `capacity` elements.
    ///
    /// # Panics
    /// Panics if `capacity` is zero or cannot be represented by `I`.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(3);
    /// chunk.push_back(2);
    /// chunk.push_front(1);
    /// assert_eq!(chunk.as_slices(), (&[1][..], &[2][..]));
    /// ```
    #[track_caller]
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            zero_capacity();
        }
        if capacity > I::MAX_REPRESENTABLE {
            buffer_too_large_for_index_type::<I>();
        }

        Self::from(alloc_block(capacity))
    }

    /// Allocates an empty chunk with room for `capacity` elements, or returns
    /// [`CapacityError`] if `capacity` is zero, cannot be represented by `I`,
    /// or the allocation fails.
    pub fn try_with_capacity(capacity: usize) -> crate::Result<Self> {
        if capacity == 0 || capacity > I::MAX_REPRESENTABLE {
            return Err(CapacityError);
        }

        Ok(Self::from(try_alloc_block(capacity)?))
    }
}

impl<T, S: ContiguousStorage<T>, I: Capacity> Chunk<T, S, I> {
    /// Returns the number of elements the chunk can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the number of elements currently in the chunk.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.as_usize()
    }

    /// Returns `true` exactly when the chunk contains zero elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` exactly when the chunk contains the maximum number of elements.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline(always)]
    fn physical_index(&self, offset: usize) -> usize {
        (self.front.as_usize() + offset) % self.capacity()
    }

    #[inline]
    fn checked_physical_index(&self, offset: I) -> Option<usize> {
        let offset = offset.as_usize();
        if offset >= self.len() {
            return None;
        }

        Some(self.physical_index(offset))
    }

    /// Returns a reference to the element at the given offset, or [`None`] if
    /// the offset is out of bounds.
    ///
    /// The element at offset 0 is the front of the chunk.
    #[inline]
    pub fn get(&self, offset: I) -> Option<&T> {
        let idx = self.checked_physical_index(offset)?;
        Some(unsafe { self.buf.storage()[idx].assume_init_ref() })
    }

    /// Returns a mutable reference to the element at the given offset, or
    /// [`None`] if the offset is out of bounds.
    #[inline]
    pub fn get_mut(&mut self, offset: I) -> Option<&mut T> {
        let idx = self.checked_physical_index(offset)?;
        Some(unsafe { self.buf.storage_mut()[idx].assume_init_mut() })
    }

    /// Places an element at position `offset` within the chunk, returning the
    /// element previously stored there.
    ///
    /// # Panics
    /// Panics if `offset` is greater than or equal to the chunk's length.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(4);
    /// chunk.push_back(1);
    /// chunk.push_back(2);
    /// chunk.push_back(4);
    /// assert_eq!(chunk.replace(2, 3), 4);
    /// assert_eq!(chunk.get(2), Some(&3));
    /// ```
    #[track_caller]
    pub fn replace(&mut self, offset: I, value: T) -> T {
        match self.get_mut(offset) {
            Some(slot) => core::mem::replace(slot, value),
            None => offset_out_of_bounds(offset.as_usize(), self.len()),
        }
    }

    /// Overwrites the element at position `offset`, dropping the old value.
    ///
    /// # Panics
    /// Panics if `offset` is greater than or equal to the chunk's length.
    #[track_caller]
    pub fn set(&mut self, offset: I, value: T) {
        self.replace(offset, value);
    }

    /// Returns a reference to the front element, or [`None`] if the chunk is empty.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.get(I::from_usize(0))
    }

    /// Returns a mutable reference to the front element, or [`None`] if the chunk is empty.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.get_mut(I::from_usize(0))
    }

    /// Returns a reference to the back element, or [`None`] if the chunk is empty.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        let last = self.len().checked_sub(1)?;
        self.get(I::from_usize(last))
    }

    /// Returns a mutable reference to the back element, or [`None`] if the chunk is empty.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        let last = self.len().checked_sub(1)?;
        self.get_mut(I::from_usize(last))
    }

    /// Prepends an element to the front of the chunk, returning `Err(value)`
    /// if it is already full.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(3);
    /// assert!(chunk.try_push_front(1).is_ok());
    /// assert!(chunk.try_push_front(2).is_ok());
    /// assert!(chunk.try_push_front(3).is_ok());
    /// assert_eq!(chunk.try_push_front(4), Err(4));
    /// ```
    pub fn try_push_front(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        let cap = self.capacity();
        let idx = (self.front.as_usize() + cap - 1) % cap;
        self.buf.storage_mut()[idx] = MaybeUninit::new(value);

        self.front = I::from_usize(idx);
        self.len = I::from_usize(self.len() + 1);

        Ok(())
    }

    /// Prepends an element to the front of the chunk.
    ///
    /// # Panics
    /// Panics if the chunk is already at capacity. See
    /// [`try_push_front`](Chunk::try_push_front) for a checked variant that
    /// never panics.
    #[track_caller]
    pub fn push_front(&mut self, value: T) {
        if self.try_push_front(value).is_err() {
            chunk_is_full();
        }
    }

    /// Appends an element to the back of the chunk, returning `Err(value)`
    /// if it is already full.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(2);
    /// assert!(chunk.try_push_back(1).is_ok());
    /// assert!(chunk.try_push_back(2).is_ok());
    /// assert_eq!(chunk.try_push_back(3), Err(3));
    /// ```
    pub fn try_push_back(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }

        let end = self.physical_index(self.len());
        self.buf.storage_mut()[end] = MaybeUninit::new(value);
        self.len = I::from_usize(self.len() + 1);

        Ok(())
    }

    /// Appends an element to the back of the chunk.
    ///
    /// # Panics
    /// Panics if the chunk is already at capacity. See
    /// [`try_push_back`](Chunk::try_push_back) for a checked variant that
    /// never panics.
    #[track_caller]
    pub fn push_back(&mut self, value: T) {
        if self.try_push_back(value).is_err() {
            chunk_is_full();
        }
    }

    /// Removes the front element and returns it, or [`None`] if the chunk is empty.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(3);
    /// chunk.push_back(1);
    /// chunk.push_back(2);
    /// assert_eq!(chunk.try_pop_front(), Some(1));
    /// assert_eq!(chunk.try_pop_front(), Some(2));
    /// assert_eq!(chunk.try_pop_front(), None);
    /// ```
    pub fn try_pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let front = self.front.as_usize();
        let result = unsafe { self.buf.storage()[front].assume_init_read() };
        self.front = I::from_usize((front + 1) % self.capacity());
        self.len = I::from_usize(self.len() - 1);

        Some(result)
    }

    /// Removes the front element and returns it.
    ///
    /// # Panics
    /// Panics if the chunk is empty.
    #[track_caller]
    pub fn pop_front(&mut self) -> T {
        match self.try_pop_front() {
            Some(value) => value,
            None => chunk_is_empty(),
        }
    }

    /// Removes the back element and returns it, or [`None`] if the chunk is empty.
    ///
    /// The front position is left untouched.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(3);
    /// chunk.push_back(1);
    /// chunk.push_back(3);
    /// assert_eq!(chunk.try_pop_back(), Some(3));
    /// assert_eq!(chunk.try_pop_back(), Some(1));
    /// assert_eq!(chunk.try_pop_back(), None);
    /// ```
    pub fn try_pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let idx = self.physical_index(self.len() - 1);
        let result = unsafe { self.buf.storage()[idx].assume_init_read() };
        self.len = I::from_usize(self.len() - 1);

        Some(result)
    }

    /// Removes the back element and returns it.
    ///
    /// # Panics
    /// Panics if the chunk is empty.
    #[track_caller]
    pub fn pop_back(&mut self) -> T {
        match self.try_pop_back() {
            Some(value) => value,
            None => chunk_is_empty(),
        }
    }

    /// Returns a pair of slices which contain, in order, the contents of the chunk.
    ///
    /// # Examples
    /// ```
    /// let mut chunk = unrolled::chunk::HeapChunk::<i32>::with_capacity(4);
    /// chunk.push_back(3);
    /// chunk.push_back(4);
    /// chunk.push_front(2);
    /// chunk.push_front(1);
    /// assert_eq!(chunk.as_slices(), (&[1, 2][..], &[3, 4][..]));
    /// ```
    pub fn as_slices(&self) -> (&[T], &[T]) {
        let cap = self.capacity();
        let front = self.front.as_usize();
        let back = front + self.len();
        let storage = self.buf.storage();

        unsafe {
            if back <= cap {
                (slice_assume_init(&storage[front..back]), &[][..])
            } else {
                (
                    slice_assume_init(&storage[front..]),
                    slice_assume_init(&storage[..back - cap]),
                )
            }
        }
    }

    /// Returns a pair of mutable slices which contain, in order, the contents of the chunk.
    pub fn as_mut_slices(&mut self) -> (&mut [T], &mut [T]) {
        let cap = self.capacity();
        let front = self.front.as_usize();
        let back = front + self.len();
        let storage = self.buf.storage_mut();

        unsafe {
            if back <= cap {
                (slice_assume_init_mut(&mut storage[front..back]), &mut [][..])
            } else {
                let (wrapped, tail) = storage.split_at_mut(front);
                (
                    slice_assume_init_mut(tail),
                    slice_assume_init_mut(&mut wrapped[..back - cap]),
                )
            }
        }
    }

    /// Returns a front-to-back iterator.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        let (front, back) = self.as_slices();
        Iter {
            front: front.iter(),
            back: back.iter(),
        }
    }

    /// Returns a front-to-back iterator that returns mutable references.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let (front, back) = self.as_mut_slices();
        IterMut {
            front: front.iter_mut(),
            back: back.iter_mut(),
        }
    }

    /// Clears the chunk, dropping all values.
    pub fn clear(&mut self) {
        let (front, back) = self.as_mut_slices();
        let front: *mut [T] = front;
        let back: *mut [T] = back;

        self.len = I::from_usize(0);
        self.front = I::from_usize(0);
        unsafe {
            front.drop_in_place();
            back.drop_in_place();
        }
    }
}

impl<T, S: ContiguousStorage<T>, I: Capacity> Index<I> for Chunk<T, S, I> {
    type Output = T;

    #[inline]
    #[track_caller]
    fn index(&self, offset: I) -> &T {
        match self.get(offset) {
            Some(item) => item,
            None => offset_out_of_bounds(offset.as_usize(), self.len()),
        }
    }
}

impl<T, S: ContiguousStorage<T>, I: Capacity> IndexMut<I> for Chunk<T, S, I> {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, offset: I) -> &mut T {
        let len = self.len();
        match self.get_mut(offset) {
            Some(item) => item,
            None => offset_out_of_bounds(offset.as_usize(), len),
        }
    }
}

impl<T, S: ContiguousStorage<T>, I: Capacity> Drop for Chunk<T, S, I> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Debug, S: ContiguousStorage<T>, I: Capacity> Debug for Chunk<T, S, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (front, back) = self.as_slices();
        f.debug_list().entries(front).entries(back).finish()
    }
}

/// An iterator over the elements of a chunk.
///
/// This `struct` is created by the [`iter`](Chunk::iter) method on [`Chunk`].
pub struct Iter<'a, T> {
    front: slice::Iter<'a, T>,
    back: slice::Iter<'a, T>,
}

impl<T: Debug> Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter")
            .field(&self.front.as_slice())
            .field(&self.back.as_slice())
            .finish()
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            front: self.front.clone(),
            back: self.back.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.front.next().or_else(|| self.back.next())
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.front.len() + self.back.len();
        (len, Some(len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        self.back.next_back().or_else(|| self.front.next_back())
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// A mutable iterator over the elements of a chunk.
///
/// This `struct` is created by the [`iter_mut`](Chunk::iter_mut) method on [`Chunk`].
pub struct IterMut<'a, T> {
    front: slice::IterMut<'a, T>,
    back: slice::IterMut<'a, T>,
}

impl<T: Debug> Debug for IterMut<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IterMut")
            .field(&self.front.as_slice())
            .field(&self.back.as_slice())
            .finish()
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        match self.front.next() {
            Some(item) => Some(item),
            None => self.back.next(),
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.front.len() + self.back.len();
        (len, Some(len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        match self.back.next_back() {
            Some(item) => Some(item),
            None => self.front.next_back(),
        }
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

impl<'a, T, S: ContiguousStorage<T>, I: Capacity> IntoIterator for &'a Chunk<T, S, I> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, S: ContiguousStorage<T>, I: Capacity> IntoIterator for &'a mut Chunk<T, S, I> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
