//! Unordered dense storage with swap-pop removal.
//!
//! Removing from the middle moves the last element into the hole. The move is
//! reported back to the caller so any index that pointed at the moved element
//! can be rewritten; this is what keeps external back-references valid.

use std::collections::TryReserveError;
use std::slice;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Element relocated by a swap-pop: it used to live at `from` and now lives
/// at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone)]
pub struct Bucket<T> {
    items: Vec<T>,
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bucket<T> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Make room for `additional` pushes that cannot fail afterwards.
    #[inline]
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.items.try_reserve(additional)
    }

    /// Append and return the new element's position.
    #[inline]
    pub fn push(&mut self, value: T) -> usize {
        let idx = self.items.len();
        self.items.push(value);
        idx
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Result<&T, BucketError> {
        let len = self.items.len();
        self.items
            .get(idx)
            .ok_or(BucketError::IndexOutOfBounds { index: idx, len })
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Remove the element at `idx` by moving the last element into its place.
    ///
    /// Returns the removed value and, when an element actually moved, where it
    /// moved from and to. Removing the last element moves nothing.
    pub fn swap_remove(&mut self, idx: usize) -> Result<(T, Option<Relocation>), BucketError> {
        let len = self.items.len();
        if idx >= len {
            return Err(BucketError::IndexOutOfBounds { index: idx, len });
        }
        let last = len - 1;
        let removed = self.items.swap_remove(idx);
        let moved = (idx != last).then_some(Relocation { from: last, to: idx });
        Ok((removed, moved))
    }

    /// Swap-remove and hand the moved element to `fix` so the caller can
    /// repoint whatever referenced its old position.
    pub fn swap_remove_with(
        &mut self,
        idx: usize,
        mut fix: impl FnMut(&T, Relocation),
    ) -> Result<T, BucketError> {
        let (removed, moved) = self.swap_remove(idx)?;
        if let Some(relocation) = moved {
            fix(&self.items[relocation.to], relocation);
        }
        Ok(removed)
    }
}

impl<'a, T> IntoIterator for &'a Bucket<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
