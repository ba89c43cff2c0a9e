//! Traits providing genericity over chunk storage and index types.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::convert::TryInto;
use core::mem::MaybeUninit;

use crate::CapacityError;

/// Two-way conversion between `Self` and `usize`.
///
/// # Safety
/// Implementors must ensure the conversion functions are each other's inverse,
/// i.e. `Capacity::from_usize(i).as_usize()` must either evaluate to `i`, or
/// panic for all `usize` values.
///
/// Using [`index_type!`] should be preferred over implementing this manually.
pub unsafe trait Capacity: Copy {
    /// The largest `usize` value that can be converted into `Self`.
    const MAX_REPRESENTABLE: usize;
    /// Convert a `usize` into `Self`.
    fn from_usize(i: usize) -> Self;
    /// Convert `self` into `usize`.
    fn as_usize(&self) -> usize;
}

#[inline(never)]
#[cold]
#[track_caller]
fn from_value_out_of_range(i: usize) -> ! {
    panic!("called `from_usize` with value out of range (is {})", i)
}

#[inline(never)]
#[cold]
#[track_caller]
fn into_value_out_of_range() -> ! {
    panic!("called `as_usize` with value out of range")
}

#[inline(never)]
#[cold]
#[track_caller]
pub(crate) fn buffer_too_large_for_index_type<I: Capacity>() -> ! {
    panic!(
        "provided storage block cannot be fully indexed by type {}",
        core::any::type_name::<I>()
    )
}

macro_rules! impl_capacity_narrow {
    ($($t:ty),*) => {$(
        unsafe impl Capacity for $t {
            const MAX_REPRESENTABLE: usize = <$t>::MAX as usize;

            #[inline]
            #[track_caller]
            fn from_usize(i: usize) -> Self {
                if let Ok(t) = i.try_into() {
                    t
                } else {
                    from_value_out_of_range(i);
                }
            }

            #[inline]
            fn as_usize(&self) -> usize {
                (*self).into()
            }
        }
    )*};
}

impl_capacity_narrow!(u8, u16);

unsafe impl Capacity for u32 {
    const MAX_REPRESENTABLE: usize = if (u32::MAX as u64) < (usize::MAX as u64) {
        u32::MAX as usize
    } else {
        usize::MAX
    };

    #[inline]
    #[track_caller]
    fn from_usize(i: usize) -> Self {
        if let Ok(t) = i.try_into() {
            t
        } else {
            from_value_out_of_range(i);
        }
    }

    #[inline]
    #[track_caller]
    fn as_usize(&self) -> usize {
        if let Ok(t) = (*self).try_into() {
            t
        } else {
            into_value_out_of_range();
        }
    }
}

unsafe impl Capacity for usize {
    const MAX_REPRESENTABLE: usize = usize::MAX;

    #[inline]
    fn from_usize(i: usize) -> Self {
        i
    }

    #[inline]
    fn as_usize(&self) -> usize {
        *self
    }
}

/// Generates a newtype wrapping an implementor of [`Capacity`].
///
/// This can help in avoiding use of the wrong index with a
/// [`UnrolledList`](crate::UnrolledList).
///
/// # Examples
/// ```
/// use unrolled::{index_type, UnrolledList};
///
/// index_type! { pub Slot: u8 };
///
/// let mut list = UnrolledList::<char, Slot>::with_chunk_capacity(4);
/// list.extend("abcdef".chars());
/// assert_eq!(list.chunk_count(), 2);
/// assert_eq!(list.get(5), Some(&'f'));
/// ```
#[macro_export]
macro_rules! index_type {
    ($v:vis $name:ident: $repr:ty) => {
        #[derive(
            core::marker::Copy,
            core::clone::Clone,
            core::default::Default,
            core::fmt::Debug,
            core::hash::Hash,
            core::cmp::PartialEq,
            core::cmp::Eq,
            core::cmp::PartialOrd,
            core::cmp::Ord)]
        $v struct $name($repr);

        unsafe impl $crate::storage::Capacity for $name {
            const MAX_REPRESENTABLE: usize = <$repr as $crate::storage::Capacity>::MAX_REPRESENTABLE;

            #[inline]
            #[track_caller]
            fn from_usize(i: usize) -> Self {
                Self(<$repr as $crate::storage::Capacity>::from_usize(i))
            }

            #[inline]
            #[track_caller]
            fn as_usize(&self) -> usize {
                <$repr as $crate::storage::Capacity>::as_usize(&self.0)
            }
        }
    }
}

/// An interface for a contiguous memory block backing a [`Chunk`](crate::chunk::Chunk).
///
/// # Safety
/// Implementors must ensure the length of the slices returned by
/// [`storage`](ContiguousStorage::storage) and
/// [`storage_mut`](ContiguousStorage::storage_mut) never changes.
pub unsafe trait ContiguousStorage<T>: Sized {
    /// Extracts a slice over the entire memory block.
    fn storage(&self) -> &[MaybeUninit<T>];
    /// Extracts a mutable slice over the entire memory block.
    fn storage_mut(&mut self) -> &mut [MaybeUninit<T>];

    /// Returns the size of the memory block in units of T.
    #[inline]
    fn capacity(&self) -> usize {
        self.storage().len()
    }
}

/// Shorthand for `&'a mut [MaybeUninit<T>]` for use with generic chunks.
pub type SliceStorage<'a, T> = &'a mut [MaybeUninit<T>];

unsafe impl<T> ContiguousStorage<T> for SliceStorage<'_, T> {
    #[inline]
    fn storage(&self) -> &[MaybeUninit<T>] {
        &self[..]
    }
    #[inline]
    fn storage_mut(&mut self) -> &mut [MaybeUninit<T>] {
        self
    }
}

/// Shorthand for [`alloc::boxed::Box<[MaybeUninit<T>]>`](alloc::boxed::Box),
/// the storage every chunk of an [`UnrolledList`](crate::UnrolledList) owns.
pub type HeapStorage<T> = Box<[MaybeUninit<T>]>;

unsafe impl<T> ContiguousStorage<T> for HeapStorage<T> {
    #[inline]
    fn storage(&self) -> &[MaybeUninit<T>] {
        self
    }
    #[inline]
    fn storage_mut(&mut self) -> &mut [MaybeUninit<T>] {
        self
    }
}

/// Allocates an uninitialized block of `capacity` slots.
///
/// Aborts the process on allocation failure, like any other infallible
/// allocation.
pub(crate) fn alloc_block<T>(capacity: usize) -> HeapStorage<T> {
    let mut block = Vec::with_capacity(capacity);
    block.resize_with(capacity, MaybeUninit::uninit);
    block.into_boxed_slice()
}

/// Allocates an uninitialized block of `capacity` slots, reporting failure
/// instead of aborting.
pub(crate) fn try_alloc_block<T>(capacity: usize) -> crate::Result<HeapStorage<T>> {
    let mut block = Vec::new();
    block.try_reserve_exact(capacity).map_err(|_| CapacityError)?;
    block.resize_with(capacity, MaybeUninit::uninit);
    Ok(block.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_index_types() {
        assert_eq!(u8::from_usize(255).as_usize(), 255);
        assert_eq!(u16::MAX_REPRESENTABLE, 65535);
        assert_eq!(<usize as Capacity>::MAX_REPRESENTABLE, usize::MAX);
    }

    #[test]
    #[should_panic(expected = "called `from_usize` with value out of range")]
    fn narrow_index_overflow_panics() {
        let _ = u8::from_usize(256);
    }

    #[test]
    fn blocks_have_requested_capacity() {
        let block = alloc_block::<u64>(7);
        assert_eq!(block.capacity(), 7);

        let block = try_alloc_block::<u64>(3).unwrap();
        assert_eq!(block.capacity(), 3);

        assert!(try_alloc_block::<u64>(usize::MAX / 2).is_err());
    }
}
