/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

use crate::error::ErrorKind;

/// The type of error for layout construction.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutError {
    #[error("axis {axis} out of range for {ndims}-dimensional layout {axes:?}")]
    AxisOutOfRange {
        axis: usize,
        ndims: usize,
        axes: Vec<usize>,
    },

    #[error("axis {axis} repeated in layout {axes:?}")]
    RepeatedAxis { axis: usize, axes: Vec<usize> },
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// The traversal order of the axes of a `D`-dimensional space: a
/// permutation of `0..D`.
///
/// The first listed axis varies fastest (it gets stride 1); each
/// following axis gets the product of the extents of all the axes
/// listed before it. With a shape `(6, 4, 5)`:
///
/// ```text
/// layout (2, 1, 0)  →  strides (20, 5, 1)    // row-major
/// layout (0, 1, 2)  →  strides (1, 6, 24)    // column-major
/// layout (1, 0, 2)  →  strides (4, 1, 24)
/// ```
///
/// ```
/// # use ndgrid::Layout;
/// assert!(Layout::new([2, 0, 1]).is_ok());
/// assert!(Layout::new([0, 0, 1]).is_err());
/// assert_eq!(Layout::<3>::row_major().axes(), &[2, 1, 0]);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Layout<const D: usize>([usize; D]);

impl<const D: usize> Layout<D> {
    /// Create a layout, checking that `axes` is a permutation of
    /// `0..D`.
    pub fn new(axes: [usize; D]) -> Result<Self, LayoutError> {
        let mut seen = [false; D];
        for &axis in axes.iter() {
            if axis >= D {
                return Err(LayoutError::AxisOutOfRange {
                    axis,
                    ndims: D,
                    axes: axes.to_vec(),
                });
            }
            if std::mem::replace(&mut seen[axis], true) {
                return Err(LayoutError::RepeatedAxis {
                    axis,
                    axes: axes.to_vec(),
                });
            }
        }
        Ok(Self(axes))
    }

    /// The last axis varies fastest: `(D-1, …, 1, 0)`.
    pub fn row_major() -> Self {
        Self(std::array::from_fn(|i| D - 1 - i))
    }

    /// The first axis varies fastest: `(0, 1, …, D-1)`.
    pub fn column_major() -> Self {
        Self(std::array::from_fn(|i| i))
    }

    /// The axes, fastest-varying first.
    pub fn axes(&self) -> &[usize; D] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, usize> {
        self.0.iter()
    }

    /// The mixed-radix weight of each axis under this layout for the
    /// given extents, or `None` if the product overflows.
    pub(crate) fn strides(&self, extents: &[usize; D]) -> Option<[usize; D]> {
        let mut strides = [0; D];
        let mut weight: usize = 1;
        for &axis in self.0.iter() {
            strides[axis] = weight;
            weight = weight.checked_mul(extents[axis])?;
        }
        Some(strides)
    }
}

impl<const D: usize> TryFrom<[usize; D]> for Layout<D> {
    type Error = LayoutError;

    fn try_from(axes: [usize; D]) -> Result<Self, Self::Error> {
        Self::new(axes)
    }
}

impl<'a, const D: usize> IntoIterator for &'a Layout<D> {
    type Item = &'a usize;
    type IntoIter = std::slice::Iter<'a, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<const D: usize> fmt::Display for Layout<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, axis) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axis)?;
        }
        write!(f, ")")
    }
}
