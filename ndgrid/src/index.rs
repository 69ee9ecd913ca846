/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::hash::Hash;
use std::ops;

use serde::Serialize;
use serde::de::DeserializeOwned;

mod sealed {
    // Private trait: only the integer types listed below implement it
    pub trait Sealed {}
}

/// The integer representation of a single coordinate.
///
/// Implemented for the primitive signed and unsigned integers. Signed
/// representations are accepted so that callers can carry coordinates
/// in whatever type their own arithmetic uses; negative values are
/// simply never in bounds.
pub trait Coord:
    sealed::Sealed
    + Copy
    + Eq
    + Ord
    + Hash
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// This coordinate as an unsigned extent, or `None` if it is
    /// negative (or does not fit).
    fn to_usize(self) -> Option<usize>;

    /// The coordinate with the given value. Only called with values
    /// bounded by a shape component of the same type, so the
    /// conversion never truncates.
    fn from_usize(value: usize) -> Self;
}

macro_rules! impl_coord {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Coord for $t {
                #[inline]
                fn to_usize(self) -> Option<usize> {
                    usize::try_from(self).ok()
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_coord!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// A point in a `D`-dimensional index space: one coordinate per axis.
///
/// The arity is part of the type, so an index can only ever be used
/// with a tile of the same dimensionality.
///
/// ```
/// # use ndgrid::Index;
/// let idx = Index::new([1, 2, 3]);
/// assert_eq!(idx[1], 2);
/// assert_eq!(idx.to_string(), "(1, 2, 3)");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Index<T, const D: usize>([T; D]);

impl<T: Coord, const D: usize> Index<T, D> {
    /// Create an index from its components.
    pub const fn new(components: [T; D]) -> Self {
        Self(components)
    }

    /// The origin `(0, …, 0)`.
    pub fn zero() -> Self {
        Self([T::from_usize(0); D])
    }

    /// The number of axes.
    pub const fn rank(&self) -> usize {
        D
    }

    pub fn components(&self) -> &[T; D] {
        &self.0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// Iterate over the components, axis 0 first.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Whether `0 <= self[i] < shape[i]` holds on every axis.
    pub fn within(&self, shape: &Self) -> bool {
        self.0
            .iter()
            .zip(shape.0.iter())
            .all(|(&c, &extent)| match (c.to_usize(), extent.to_usize()) {
                (Some(c), Some(extent)) => c < extent,
                _ => false,
            })
    }

    /// The components as unsigned extents, or `None` if any is
    /// negative.
    pub(crate) fn to_usizes(&self) -> Option<[usize; D]> {
        let mut out = [0; D];
        for (slot, c) in out.iter_mut().zip(self.0.iter()) {
            *slot = c.to_usize()?;
        }
        Some(out)
    }

    pub(crate) fn from_usizes(components: [usize; D]) -> Self {
        Self(components.map(T::from_usize))
    }
}

impl<T: Coord, const D: usize> From<[T; D]> for Index<T, D> {
    fn from(components: [T; D]) -> Self {
        Self(components)
    }
}

impl<T: Coord, const D: usize> From<Index<T, D>> for [T; D] {
    fn from(index: Index<T, D>) -> Self {
        index.0
    }
}

impl<T, const D: usize> ops::Index<usize> for Index<T, D> {
    type Output = T;

    fn index(&self, axis: usize) -> &T {
        &self.0[axis]
    }
}

impl<T, const D: usize> ops::IndexMut<usize> for Index<T, D> {
    fn index_mut(&mut self, axis: usize) -> &mut T {
        &mut self.0[axis]
    }
}

impl<T, const D: usize> IntoIterator for Index<T, D> {
    type Item = T;
    type IntoIter = std::array::IntoIter<T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T, const D: usize> IntoIterator for &'a Index<T, D> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: fmt::Display, const D: usize> fmt::Display for Index<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}
