/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! N-dimensional grids over pluggable storage.
//!
//! A [`Grid`] pairs a logical index space with a physical extent of
//! bytes:
//!
//! - an [`Index`] names one cell of a `D`-dimensional space;
//! - a [`Layout`] orders the axes, fastest-varying first;
//! - a [`Tile`] combines a shape and a layout into a bijection between
//!   indices and linear offsets, and supports iteration and slicing;
//! - a [`Storage`] owns the bytes, either on the heap ([`Heap`]) or in
//!   a memory-mapped file ([`Direct`], [`ConstDirect`]).
//!
//! ```no_run
//! use ndgrid::{Direct, Grid, Index, Layout, Tile};
//!
//! # fn main() -> anyhow::Result<()> {
//! let tile = Tile::new(Index::new([6, 4, 5]), Layout::new([2, 1, 0])?)?;
//! let size = tile.size() * std::mem::size_of::<f64>();
//! Direct::create("grid.dat", size)?;
//! let mut grid: Grid<f64, _, 3, _> = Grid::new(tile, Direct::open("grid.dat", size)?)?;
//! grid[Index::new([1, 1, 1])] = 1.0;
//! # Ok(())
//! # }
//! ```
//!
//! A backing file is a raw, headerless sequence of cells in offset
//! order. Nothing in the file records the layout it was written with;
//! reading it back under a different layout yields a transposed view.

/// Storage configuration, loaded from the environment or YAML.
pub mod config;

/// The error taxonomy shared by all error types.
pub mod error;

mod grid;
pub use grid::Grid;
pub use grid::GridError;

mod index;
pub use index::Coord;
pub use index::Index;

mod layout;
pub use layout::Layout;
pub use layout::LayoutError;

/// Heap and memory-mapped storage backends.
pub mod storage;
pub use storage::ConstDirect;
pub use storage::Direct;
pub use storage::Heap;
pub use storage::Storage;
pub use storage::StorageError;
pub use storage::StorageMut;

mod tile;
pub use tile::Tile;
pub use tile::TileError;
pub use tile::TileIterator;
pub use tile::TileSlice;

pub use config::StorageConfig;
pub use error::ErrorKind;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
