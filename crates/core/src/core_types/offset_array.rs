//! Arrays indexed by an arbitrary integer interval
//!
//! The column grid runs from the top snow node (negative index) through the
//! ground surface (index 0) down to the bottom soil node. [`OffsetArray`]
//! stores such a profile in a flat `Vec` together with the lowest index, so
//! `array[i]` maps to `values[i - min_index]`.

use std::ops::{Index, IndexMut};

/// Fixed-range array indexed by `min_index..=max_index`.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetArray<T> {
    min_index: i32,
    values: Vec<T>,
}

impl<T: Clone> OffsetArray<T> {
    /// Create an array covering `min_index..=max_index` filled with `fill`.
    ///
    /// Panics if `max_index < min_index`.
    #[must_use]
    pub fn filled(min_index: i32, max_index: i32, fill: T) -> Self {
        assert!(
            max_index >= min_index,
            "OffsetArray: max index {max_index} below min index {min_index}"
        );
        let len = (max_index - min_index + 1) as usize;
        Self {
            min_index,
            values: vec![fill; len],
        }
    }

    /// Overwrite `self` with the contents of `other` (same range).
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.min_index, other.min_index);
        self.values.clone_from_slice(&other.values);
    }
}

impl<T: Clone + Default> OffsetArray<T> {
    /// Create an array covering `min_index..=max_index` filled with `T::default()`.
    #[must_use]
    pub fn new(min_index: i32, max_index: i32) -> Self {
        Self::filled(min_index, max_index, T::default())
    }
}

impl<T> OffsetArray<T> {
    /// Lowest valid index.
    #[inline]
    pub fn min_index(&self) -> i32 {
        self.min_index
    }

    /// Highest valid index.
    #[inline]
    pub fn max_index(&self) -> i32 {
        self.min_index + self.values.len() as i32 - 1
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; construction requires at least one element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in index order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Values for `from..=to` in index order.
    #[inline]
    pub fn range(&self, from: i32, to: i32) -> &[T] {
        &self.values[self.offset(from)..=self.offset(to)]
    }

    /// Mutable values for `from..=to` in index order.
    #[inline]
    pub fn range_mut(&mut self, from: i32, to: i32) -> &mut [T] {
        let (a, b) = (self.offset(from), self.offset(to));
        &mut self.values[a..=b]
    }

    #[inline]
    fn offset(&self, index: i32) -> usize {
        debug_assert!(
            index >= self.min_index && index <= self.max_index(),
            "OffsetArray: index {index} outside {}..={}",
            self.min_index,
            self.max_index()
        );
        (index - self.min_index) as usize
    }
}

impl OffsetArray<f64> {
    /// Largest value (NaN values are ignored).
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest value (NaN values are ignored).
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// `true` when every element is finite.
    pub fn all_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

impl<T> Index<i32> for OffsetArray<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: i32) -> &T {
        &self.values[self.offset(index)]
    }
}

impl<T> IndexMut<i32> for OffsetArray<T> {
    #[inline]
    fn index_mut(&mut self, index: i32) -> &mut T {
        let offset = self.offset(index);
        &mut self.values[offset]
    }
}
