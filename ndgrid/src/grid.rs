/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::marker::PhantomData;
use std::mem::size_of;
use std::ops;

use bytemuck::Pod;

use crate::error::ErrorKind;
use crate::index::Coord;
use crate::index::Index;
use crate::layout::Layout;
use crate::storage::Storage;
use crate::storage::StorageError;
use crate::storage::StorageMut;
use crate::tile::Tile;
use crate::tile::TileError;
use crate::tile::TileIterator;
use crate::tile::TileSlice;

/// The type of error for grid operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    #[error(
        "storage holds {actual} bytes, but {cells} cells of {cell_size} bytes need {expected}"
    )]
    SizeMismatch {
        expected: usize,
        actual: usize,
        cells: usize,
        cell_size: usize,
    },

    #[error("storage cannot hold cells of type {cell}: {reason}")]
    CellCast { cell: &'static str, reason: String },

    #[error(transparent)]
    Tile(#[from] TileError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GridError::SizeMismatch { .. } | GridError::CellCast { .. } => {
                ErrorKind::Configuration
            }
            GridError::Tile(err) => err.kind(),
            GridError::Storage(err) => err.kind(),
        }
    }
}

/// A grid binds a [`Tile`], the logical index space, to a [`Storage`]
/// extent holding one `C` per cell.
///
/// Cells are addressed by index (translated through the tile) or by
/// offset (directly). Reads and writes share the same addressing
/// path:
///
/// ```
/// # use ndgrid::{Grid, Heap, Index, Tile};
/// let tile = Tile::row_major(Index::new([2, 3])).unwrap();
/// let mut grid: Grid<f64, _, 2, _> = Grid::new(tile, Heap::new(6 * 8)).unwrap();
/// grid[Index::new([1, 2])] = 4.5;
/// assert_eq!(grid[5], 4.5);
/// ```
///
/// Iterating a grid yields indices, not cells; cell access is a second
/// step. Since a [`Tile`] is `Copy`, a copy of it can drive a loop
/// that writes through the grid:
///
/// ```
/// # use ndgrid::{Grid, Heap, Index, Tile};
/// # let tile = Tile::row_major(Index::new([2, 3])).unwrap();
/// # let mut grid: Grid<i32, _, 2, _> = Grid::new(tile, Heap::new(6 * 4)).unwrap();
/// let tile = *grid.tile();
/// for idx in &tile {
///     grid[idx] = idx[0] * 10 + idx[1];
/// }
/// assert_eq!(grid[Index::new([1, 2])], 12);
/// ```
#[derive(Debug)]
pub struct Grid<C, T, const D: usize, S> {
    tile: Tile<T, D>,
    storage: S,
    _cell: PhantomData<C>,
}

impl<C: Pod, T: Coord, const D: usize, S: Storage> Grid<C, T, D, S> {
    /// Bind `tile` to `storage`. The storage must hold exactly
    /// `tile.size() * size_of::<C>()` bytes, suitably aligned for `C`.
    pub fn new(tile: Tile<T, D>, storage: S) -> Result<Self, GridError> {
        let cell_size = size_of::<C>();
        let expected = tile.size().saturating_mul(cell_size);
        let actual = storage.byte_size();
        if actual != expected {
            return Err(GridError::SizeMismatch {
                expected,
                actual,
                cells: tile.size(),
                cell_size,
            });
        }
        bytemuck::try_cast_slice::<u8, C>(storage.bytes()).map_err(|err| {
            GridError::CellCast {
                cell: std::any::type_name::<C>(),
                reason: err.to_string(),
            }
        })?;

        Ok(Self {
            tile,
            storage,
            _cell: PhantomData,
        })
    }

    pub fn tile(&self) -> &Tile<T, D> {
        &self.tile
    }

    pub fn shape(&self) -> &Index<T, D> {
        self.tile.shape()
    }

    pub fn layout(&self) -> &Layout<D> {
        self.tile.layout()
    }

    /// The number of cells.
    pub fn size(&self) -> usize {
        self.tile.size()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Unbind the grid, returning its tile and storage.
    pub fn into_parts(self) -> (Tile<T, D>, S) {
        (self.tile, self.storage)
    }

    /// All cells, in offset order.
    pub fn cells(&self) -> &[C] {
        bytemuck::cast_slice(self.storage.bytes())
    }

    /// The cell at `index`.
    pub fn get(&self, index: &Index<T, D>) -> Result<&C, GridError> {
        let offset = self.tile.offset(index)?;
        Ok(&self.cells()[offset])
    }

    /// The cell at `offset`.
    pub fn at(&self, offset: usize) -> Result<&C, GridError> {
        let size = self.size();
        self.cells()
            .get(offset)
            .ok_or(GridError::Tile(TileError::OffsetOutOfRange { offset, size }))
    }

    /// Iterate over the indices of the grid in offset order.
    pub fn iter(&self) -> TileIterator<'_, T, D> {
        self.tile.iter()
    }

    /// A view of the indices in `[begin, end)`.
    pub fn slice(
        &self,
        begin: Index<T, D>,
        end: Index<T, D>,
    ) -> Result<TileSlice<'_, T, D>, GridError> {
        Ok(self.tile.slice(begin, end)?)
    }

    /// Push outstanding writes to the backing store.
    pub fn flush(&self) -> Result<(), GridError> {
        Ok(self.storage.flush()?)
    }
}

impl<C: Pod, T: Coord, const D: usize, S: StorageMut> Grid<C, T, D, S> {
    /// All cells, in offset order.
    pub fn cells_mut(&mut self) -> &mut [C] {
        bytemuck::cast_slice_mut(self.storage.bytes_mut())
    }

    pub fn get_mut(&mut self, index: &Index<T, D>) -> Result<&mut C, GridError> {
        let offset = self.tile.offset(index)?;
        Ok(&mut self.cells_mut()[offset])
    }

    pub fn at_mut(&mut self, offset: usize) -> Result<&mut C, GridError> {
        let size = self.size();
        self.cells_mut()
            .get_mut(offset)
            .ok_or(GridError::Tile(TileError::OffsetOutOfRange { offset, size }))
    }

    /// Set every cell to `f(index)`, visiting cells in offset order.
    pub fn fill_with(&mut self, mut f: impl FnMut(&Index<T, D>) -> C) {
        let tile = self.tile;
        for (index, cell) in tile.iter().zip(self.cells_mut().iter_mut()) {
            *cell = f(&index);
        }
    }
}

impl<C: Pod, T: Coord, const D: usize, S: Storage> ops::Index<Index<T, D>> for Grid<C, T, D, S> {
    type Output = C;

    fn index(&self, index: Index<T, D>) -> &C {
        self.get(&index).unwrap_or_else(|err| panic!("{}", err))
    }
}

impl<C: Pod, T: Coord, const D: usize, S: StorageMut> ops::IndexMut<Index<T, D>>
    for Grid<C, T, D, S>
{
    fn index_mut(&mut self, index: Index<T, D>) -> &mut C {
        self.get_mut(&index).unwrap_or_else(|err| panic!("{}", err))
    }
}

impl<C: Pod, T: Coord, const D: usize, S: Storage> ops::Index<usize> for Grid<C, T, D, S> {
    type Output = C;

    fn index(&self, offset: usize) -> &C {
        &self.cells()[offset]
    }
}

impl<C: Pod, T: Coord, const D: usize, S: StorageMut> ops::IndexMut<usize> for Grid<C, T, D, S> {
    fn index_mut(&mut self, offset: usize) -> &mut C {
        &mut self.cells_mut()[offset]
    }
}

impl<'a, C: Pod, T: Coord, const D: usize, S: Storage> IntoIterator for &'a Grid<C, T, D, S> {
    type Item = Index<T, D>;
    type IntoIter = TileIterator<'a, T, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
