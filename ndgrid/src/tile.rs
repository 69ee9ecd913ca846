/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;
use std::iter::FusedIterator;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::ErrorKind;
use crate::index::Coord;
use crate::index::Index;
use crate::layout::Layout;
use crate::layout::LayoutError;

/// The type of error for tile operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TileError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("shape {shape} has a negative extent on axis {axis}")]
    NegativeExtent { axis: usize, shape: String },

    #[error("shape {shape} has more cells than fit in usize")]
    Overflow { shape: String },

    #[error("index {index} out of bounds for shape {shape}")]
    OutOfBounds { index: String, shape: String },

    #[error("offset {offset} out of range {size}")]
    OffsetOutOfRange { offset: usize, size: usize },

    #[error("invalid slice {begin}..{end} of shape {shape}")]
    InvalidSlice {
        begin: String,
        end: String,
        shape: String,
    },
}

impl TileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TileError::OutOfBounds { .. } | TileError::OffsetOutOfRange { .. } => {
                ErrorKind::OutOfBounds
            }
            TileError::Layout(_)
            | TileError::InvalidDims { .. }
            | TileError::NegativeExtent { .. }
            | TileError::Overflow { .. }
            | TileError::InvalidSlice { .. } => ErrorKind::Configuration,
        }
    }
}

/// A tile is the logical index space of a grid: a shape, giving the
/// extent of each axis, paired with a [`Layout`] that fixes the order
/// in which axes are linearized.
///
/// The tile defines a bijection between the indices within its shape
/// and the offsets `0..size()`. Offsets are computed with mixed-radix
/// weights: walking the layout, each axis is weighted by the product
/// of the extents of the axes listed before it.
///
/// ```
/// # use ndgrid::{Index, Layout, Tile};
/// let tile = Tile::new(Index::new([6, 4, 5]), Layout::new([2, 1, 0]).unwrap()).unwrap();
/// assert_eq!(tile.size(), 120);
/// assert_eq!(tile.offset(&Index::new([0, 1, 0])).unwrap(), 5);
/// assert_eq!(tile.index(20).unwrap(), Index::new([1, 0, 0]));
/// ```
///
/// Tiles are immutable values; a different shape is a different tile.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Tile<T, const D: usize> {
    shape: Index<T, D>,
    layout: Layout<D>,
    // Derived from `shape` and `layout` at construction.
    extents: [usize; D],
    strides: [usize; D],
    size: usize,
}

impl<T: Coord, const D: usize> Tile<T, D> {
    /// Create a new tile. Fails if any extent is negative or if the
    /// number of cells overflows `usize`.
    pub fn new(shape: Index<T, D>, layout: Layout<D>) -> Result<Self, TileError> {
        let mut extents = [0; D];
        for (axis, c) in shape.iter().enumerate() {
            extents[axis] = c.to_usize().ok_or_else(|| TileError::NegativeExtent {
                axis,
                shape: shape.to_string(),
            })?;
        }
        let overflow = || TileError::Overflow {
            shape: shape.to_string(),
        };
        let strides = layout.strides(&extents).ok_or_else(overflow)?;
        let size = extents
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(overflow)?;

        Ok(Self {
            shape,
            layout,
            extents,
            strides,
            size,
        })
    }

    /// A tile whose last axis varies fastest.
    pub fn row_major(shape: Index<T, D>) -> Result<Self, TileError> {
        Self::new(shape, Layout::row_major())
    }

    pub fn shape(&self) -> &Index<T, D> {
        &self.shape
    }

    pub fn layout(&self) -> &Layout<D> {
        &self.layout
    }

    /// The number of dimensions.
    pub const fn rank(&self) -> usize {
        D
    }

    /// The number of cells in this tile.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The distance, in cells, between neighbors along each axis.
    pub fn strides(&self) -> &[usize; D] {
        &self.strides
    }

    /// The shape as unsigned extents.
    pub fn extents(&self) -> &[usize; D] {
        &self.extents
    }

    /// Whether `index` lies within the shape of this tile.
    pub fn contains(&self, index: &Index<T, D>) -> bool {
        index.within(&self.shape)
    }

    /// The offset of `index`, or [`TileError::OutOfBounds`] if it lies
    /// outside the shape.
    pub fn offset(&self, index: &Index<T, D>) -> Result<usize, TileError> {
        if !self.contains(index) {
            return Err(TileError::OutOfBounds {
                index: index.to_string(),
                shape: self.shape.to_string(),
            });
        }
        Ok(self.offset_unchecked(index))
    }

    /// The offset of `index`, which the caller guarantees is within
    /// the shape. Bounds are only asserted in debug builds; an index
    /// outside the shape yields an unspecified offset.
    #[inline]
    pub fn offset_unchecked(&self, index: &Index<T, D>) -> usize {
        debug_assert!(
            self.contains(index),
            "index {} out of bounds for shape {}",
            index,
            self.shape
        );
        index
            .iter()
            .zip(self.strides.iter())
            .map(|(c, stride)| c.to_usize().unwrap_or(0) * stride)
            .sum()
    }

    /// The index at `offset`; the inverse of [`Tile::offset`].
    pub fn index(&self, offset: usize) -> Result<Index<T, D>, TileError> {
        if offset >= self.size {
            return Err(TileError::OffsetOutOfRange {
                offset,
                size: self.size,
            });
        }
        let mut rest = offset;
        let mut components = [0; D];
        for &axis in self.layout.iter() {
            components[axis] = rest % self.extents[axis];
            rest /= self.extents[axis];
        }
        Ok(Index::from_usizes(components))
    }

    /// Iterate over every index of this tile in ascending offset
    /// order.
    pub fn iter(&self) -> TileIterator<'_, T, D> {
        TileIterator::new(self, [0; D], self.extents, self.layout)
    }

    /// A view of the hyper-rectangle `[begin, end)`, traversed in this
    /// tile's layout.
    pub fn slice(
        &self,
        begin: Index<T, D>,
        end: Index<T, D>,
    ) -> Result<TileSlice<'_, T, D>, TileError> {
        self.slice_with_layout(begin, end, self.layout)
    }

    /// A view of the hyper-rectangle `[begin, end)`, traversed in the
    /// order given by `layout`. Offsets reported by the view are still
    /// those of this tile.
    pub fn slice_with_layout(
        &self,
        begin: Index<T, D>,
        end: Index<T, D>,
        layout: Layout<D>,
    ) -> Result<TileSlice<'_, T, D>, TileError> {
        let invalid = || TileError::InvalidSlice {
            begin: begin.to_string(),
            end: end.to_string(),
            shape: self.shape.to_string(),
        };
        let b = begin.to_usizes().ok_or_else(invalid)?;
        let e = end.to_usizes().ok_or_else(invalid)?;
        for axis in 0..D {
            if b[axis] > e[axis] || e[axis] > self.extents[axis] {
                return Err(invalid());
            }
        }
        Ok(TileSlice {
            tile: self,
            begin: b,
            end: e,
            layout,
        })
    }

    /// The whole tile, traversed in the order given by `layout`.
    pub fn reorder(&self, layout: Layout<D>) -> TileSlice<'_, T, D> {
        TileSlice {
            tile: self,
            begin: [0; D],
            end: self.extents,
            layout,
        }
    }
}

impl<'a, T: Coord, const D: usize> IntoIterator for &'a Tile<T, D> {
    type Item = Index<T, D>;
    type IntoIter = TileIterator<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Coord, const D: usize> fmt::Display for Tile<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape {} layout {}", self.shape, self.layout)
    }
}

/// The serialized form of a tile. The derived values are recomputed,
/// and revalidated, on the way back in.
#[derive(Serialize, Deserialize)]
struct TileSpec<T> {
    shape: Vec<T>,
    layout: Vec<usize>,
}

impl<T: Coord, const D: usize> Tile<T, D> {
    fn from_spec(spec: TileSpec<T>) -> Result<Self, TileError> {
        let got = spec.shape.len().max(spec.layout.len());
        let dims = || TileError::InvalidDims { expected: D, got };
        let shape: [T; D] = spec.shape.try_into().map_err(|_| dims())?;
        let layout: [usize; D] = spec.layout.try_into().map_err(|_| dims())?;
        Tile::new(Index::new(shape), Layout::new(layout)?)
    }
}

impl<T: Coord, const D: usize> Serialize for Tile<T, D> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TileSpec {
            shape: self.shape.as_slice().to_vec(),
            layout: self.layout.axes().to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: Coord, const D: usize> Deserialize<'de> for Tile<T, D> {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let spec = TileSpec::<T>::deserialize(deserializer)?;
        Tile::from_spec(spec).map_err(serde::de::Error::custom)
    }
}

/// A hyper-rectangular region of a [`Tile`], with its own traversal
/// order. Slices borrow their tile and never copy cells; they only
/// restrict which indices are visited.
#[derive(Clone, Copy, Debug)]
pub struct TileSlice<'a, T, const D: usize> {
    tile: &'a Tile<T, D>,
    begin: [usize; D],
    end: [usize; D],
    layout: Layout<D>,
}

impl<'a, T: Coord, const D: usize> TileSlice<'a, T, D> {
    /// The tile this is a slice of.
    pub fn tile(&self) -> &'a Tile<T, D> {
        self.tile
    }

    /// The first index of the region, inclusive.
    pub fn begin(&self) -> Index<T, D> {
        Index::from_usizes(self.begin)
    }

    /// The end of the region, exclusive on every axis.
    pub fn end(&self) -> Index<T, D> {
        Index::from_usizes(self.end)
    }

    pub fn layout(&self) -> &Layout<D> {
        &self.layout
    }

    /// The extent of the region along each axis.
    pub fn shape(&self) -> Index<T, D> {
        Index::from_usizes(std::array::from_fn(|axis| {
            self.end[axis] - self.begin[axis]
        }))
    }

    /// The number of indices in the region.
    pub fn len(&self) -> usize {
        self.begin
            .iter()
            .zip(self.end.iter())
            .map(|(b, e)| e - b)
            .product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `index` falls inside the region.
    pub fn contains(&self, index: &Index<T, D>) -> bool {
        match index.to_usizes() {
            Some(c) => (0..D).all(|axis| self.begin[axis] <= c[axis] && c[axis] < self.end[axis]),
            None => false,
        }
    }

    /// Iterate over the indices of the region in this slice's layout
    /// order.
    pub fn iter(&self) -> TileIterator<'a, T, D> {
        TileIterator::new(self.tile, self.begin, self.end, self.layout)
    }

    /// The offsets, in the parent tile, of the indices visited by
    /// [`TileSlice::iter`].
    pub fn offsets(&self) -> impl Iterator<Item = usize> + 'a {
        let tile = self.tile;
        self.iter().map(move |index| tile.offset_unchecked(&index))
    }
}

impl<'a, T: Coord, const D: usize> IntoIterator for &TileSlice<'a, T, D> {
    type Item = Index<T, D>;
    type IntoIter = TileIterator<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterates over the indices of a hyper-rectangle `[begin, end)` of a
/// tile.
///
/// The cursor advances like an odometer: the first axis of the layout
/// turns over fastest, and each time an axis reaches its end it is
/// reset to its beginning and the next axis in the layout is bumped.
/// Over a whole tile in the tile's own layout this visits offsets
/// `0, 1, …, size() - 1` in order.
#[derive(Clone, Debug)]
pub struct TileIterator<'a, T, const D: usize> {
    tile: &'a Tile<T, D>,
    begin: [usize; D],
    end: [usize; D],
    layout: Layout<D>,
    cursor: Option<[usize; D]>,
    remaining: usize,
}

impl<'a, T: Coord, const D: usize> TileIterator<'a, T, D> {
    fn new(tile: &'a Tile<T, D>, begin: [usize; D], end: [usize; D], layout: Layout<D>) -> Self {
        let remaining = begin
            .iter()
            .zip(end.iter())
            .map(|(b, e)| e.saturating_sub(*b))
            .product();
        Self {
            tile,
            begin,
            end,
            layout,
            cursor: (remaining > 0).then_some(begin),
            remaining,
        }
    }

    /// The tile being traversed.
    pub fn tile(&self) -> &'a Tile<T, D> {
        self.tile
    }
}

impl<T: Coord, const D: usize> Iterator for TileIterator<'_, T, D> {
    type Item = Index<T, D>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;

        let mut cursor = current;
        let mut exhausted = true;
        for &axis in self.layout.iter() {
            cursor[axis] += 1;
            if cursor[axis] < self.end[axis] {
                exhausted = false;
                break;
            }
            cursor[axis] = self.begin[axis];
        }
        self.cursor = (!exhausted).then_some(cursor);
        self.remaining -= 1;

        Some(Index::from_usizes(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Coord, const D: usize> ExactSizeIterator for TileIterator<'_, T, D> {}

impl<T: Coord, const D: usize> FusedIterator for TileIterator<'_, T, D> {}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;
    use crate::strategy::gen_tile;
    use crate::strategy::gen_tile_and_region;

    fn tile3(shape: [i32; 3], layout: [usize; 3]) -> Tile<i32, 3> {
        Tile::new(Index::new(shape), Layout::new(layout).unwrap()).unwrap()
    }

    #[test]
    fn test_offsets_of_reference_tile() {
        let tile = tile3([6, 4, 5], [2, 1, 0]);
        assert_eq!(tile.size(), 120);
        assert_eq!(tile.strides(), &[20, 5, 1]);
        assert_eq!(tile.offset(&Index::new([0, 0, 0])).unwrap(), 0);
        assert_eq!(tile.offset(&Index::new([0, 0, 1])).unwrap(), 1);
        assert_eq!(tile.offset(&Index::new([0, 1, 0])).unwrap(), 5);
        assert_eq!(tile.offset(&Index::new([1, 0, 0])).unwrap(), 20);
        assert_eq!(tile.offset(&Index::new([5, 3, 4])).unwrap(), 119);
    }

    #[test]
    fn test_column_major_offsets() {
        let tile = tile3([6, 4, 5], [0, 1, 2]);
        assert_eq!(tile.offset(&Index::new([1, 0, 0])).unwrap(), 1);
        assert_eq!(tile.offset(&Index::new([0, 1, 0])).unwrap(), 6);
        assert_eq!(tile.offset(&Index::new([0, 0, 1])).unwrap(), 24);
        assert_eq!(tile.index(25).unwrap(), Index::new([1, 0, 1]));
    }

    #[test]
    fn test_out_of_bounds() {
        let tile = tile3([6, 4, 5], [2, 1, 0]);
        let err = tile.offset(&Index::new([6, 0, 0])).unwrap_err();
        assert!(matches!(err, TileError::OutOfBounds { .. }));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert!(tile.offset(&Index::new([0, -1, 0])).is_err());

        let err = tile.index(120).unwrap_err();
        assert!(matches!(
            err,
            TileError::OffsetOutOfRange {
                offset: 120,
                size: 120
            }
        ));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_invalid_tiles() {
        let err = Tile::new(Index::new([3, -1]), Layout::row_major()).unwrap_err();
        assert!(matches!(err, TileError::NegativeExtent { axis: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Tile::new(Index::new([usize::MAX, 3]), Layout::row_major()).unwrap_err();
        assert!(matches!(err, TileError::Overflow { .. }));
    }

    #[test]
    fn test_degenerate_tiles() {
        let empty = Tile::row_major(Index::new([3usize, 0, 2])).unwrap();
        assert_eq!(empty.size(), 0);
        assert_eq!(empty.iter().count(), 0);
        assert!(empty.index(0).is_err());

        let scalar = Tile::<u8, 0>::row_major(Index::new([])).unwrap();
        assert_eq!(scalar.size(), 1);
        assert_eq!(scalar.iter().collect::<Vec<_>>(), vec![Index::new([])]);
        assert_eq!(scalar.offset(&Index::new([])).unwrap(), 0);
    }

    #[test]
    fn test_iteration_order() {
        let tile = Tile::new(Index::new([2usize, 3]), Layout::new([0, 1]).unwrap()).unwrap();
        let visited: Vec<_> = tile.iter().map(<[usize; 2]>::from).collect();
        assert_eq!(
            visited,
            vec![[0, 0], [1, 0], [0, 1], [1, 1], [0, 2], [1, 2]]
        );

        // Restartable.
        assert_eq!(tile.iter().count(), 6);
        assert_eq!((&tile).into_iter().len(), 6);
    }

    #[test]
    fn test_slice() {
        let tile = tile3([6, 4, 5], [2, 1, 0]);
        let slice = tile
            .slice(Index::new([1, 1, 1]), Index::new([3, 2, 4]))
            .unwrap();
        assert_eq!(slice.shape(), Index::new([2, 1, 3]));
        assert_eq!(slice.len(), 6);
        assert_eq!(slice.begin(), Index::new([1, 1, 1]));
        assert_eq!(slice.end(), Index::new([3, 2, 4]));
        assert_eq!(
            slice.offsets().collect::<Vec<_>>(),
            vec![26, 27, 28, 46, 47, 48]
        );

        let transposed = tile
            .slice_with_layout(
                Index::new([1, 1, 1]),
                Index::new([3, 2, 4]),
                Layout::new([0, 1, 2]).unwrap(),
            )
            .unwrap();
        assert_eq!(
            transposed.offsets().collect::<Vec<_>>(),
            vec![26, 46, 27, 47, 28, 48]
        );
    }

    #[test]
    fn test_invalid_slices() {
        let tile = tile3([6, 4, 5], [2, 1, 0]);
        for (begin, end) in [
            ([0, 0, 0], [7, 4, 5]),
            ([2, 0, 0], [1, 4, 5]),
            ([-1, 0, 0], [1, 4, 5]),
        ] {
            let err = tile.slice(Index::new(begin), Index::new(end)).unwrap_err();
            assert!(matches!(err, TileError::InvalidSlice { .. }));
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }

        let empty = tile
            .slice(Index::new([2, 0, 0]), Index::new([2, 4, 5]))
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.iter().next(), None);
    }

    #[test]
    fn test_reorder() {
        let tile = Tile::row_major(Index::new([2u32, 2])).unwrap();
        let offsets: Vec<_> = tile.reorder(Layout::column_major()).offsets().collect();
        assert_eq!(offsets, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_serde() {
        let tile = tile3([6, 4, 5], [2, 1, 0]);
        let json = serde_json::to_string(&tile).unwrap();
        assert_eq!(json, r#"{"shape":[6,4,5],"layout":[2,1,0]}"#);
        let back: Tile<i32, 3> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tile);

        assert!(
            serde_json::from_str::<Tile<i32, 3>>(r#"{"shape":[6,4,5],"layout":[2,2,0]}"#).is_err()
        );
        assert!(serde_json::from_str::<Tile<i32, 3>>(r#"{"shape":[6,4],"layout":[1,0]}"#).is_err());
        assert!(
            serde_json::from_str::<Tile<i32, 3>>(r#"{"shape":[6,-4,5],"layout":[2,1,0]}"#).is_err()
        );
    }

    proptest! {
        #[test]
        fn offset_index_round_trip(tile in gen_tile::<3>(6)) {
            for offset in 0..tile.size() {
                let index = tile.index(offset).unwrap();
                prop_assert_eq!(tile.offset(&index).unwrap(), offset);
            }
        }

        #[test]
        fn index_offset_round_trip(tile in gen_tile::<4>(4)) {
            for index in &tile {
                let offset = tile.offset(&index).unwrap();
                prop_assert_eq!(tile.index(offset).unwrap(), index);
            }
        }

        #[test]
        fn size_is_product_of_shape(tile in gen_tile::<3>(8)) {
            prop_assert_eq!(tile.size(), tile.shape().iter().product::<usize>());
        }

        #[test]
        fn iteration_visits_offsets_in_order(tile in gen_tile::<3>(5)) {
            let offsets: Vec<_> = tile.iter().map(|i| tile.offset(&i).unwrap()).collect();
            prop_assert_eq!(offsets, (0..tile.size()).collect::<Vec<_>>());
            let distinct: HashSet<_> = tile.iter().collect();
            prop_assert_eq!(distinct.len(), tile.size());
        }

        #[test]
        fn slices_visit_their_region((tile, begin, end) in gen_tile_and_region::<3>(5)) {
            let slice = tile.slice(begin, end).unwrap();
            let visited: Vec<_> = slice.iter().collect();
            prop_assert_eq!(visited.len(), slice.len());

            let expected: Vec<_> = tile.iter().filter(|i| slice.contains(i)).collect();
            prop_assert_eq!(&visited, &expected);

            let offsets: Vec<_> = slice.offsets().collect();
            prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
