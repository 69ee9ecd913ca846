/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for [`Tile`] and related types.
//!
//! These strategies are used in `proptest`-based tests to construct
//! randomized tiles (arbitrary shapes under arbitrary layouts) and
//! regions within them.
//!
//! Example usage:
//!
//! ```ignore
//! use proptest::prelude::*;
//!
//! use crate::strategy::gen_tile;
//!
//! proptest! {
//!     #[test]
//!     fn test_tile(tile in gen_tile::<3>(6)) {
//!         // Use `tile` as input to offset or iteration tests
//!     }
//! }
//! ```
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::Index;
use crate::Layout;
use crate::Tile;

/// Generates a uniformly random permutation of `0..D`.
pub fn gen_layout<const D: usize>() -> impl Strategy<Value = Layout<D>> {
    Just((0..D).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(|axes| Layout::new(axes.try_into().unwrap()).unwrap())
}

/// Generates a `D`-dimensional tile where each extent lies in
/// `1..=max_len`, under a random layout.
pub fn gen_tile<const D: usize>(max_len: usize) -> impl Strategy<Value = Tile<usize, D>> {
    (
        prop::collection::vec(1..=max_len, D),
        gen_layout::<D>(),
    )
        .prop_map(|(shape, layout)| {
            Tile::new(Index::new(shape.try_into().unwrap()), layout).unwrap()
        })
}

/// Generates a triple `(tile, begin, end)` where `[begin, end)` is a
/// (possibly empty) hyper-rectangle within `tile`.
pub fn gen_tile_and_region<const D: usize>(
    max_len: usize,
) -> impl Strategy<Value = (Tile<usize, D>, Index<usize, D>, Index<usize, D>)> {
    gen_tile::<D>(max_len).prop_flat_map(|tile| {
        let ranges: Vec<_> = tile
            .extents()
            .iter()
            .map(|&extent| (0..=extent).prop_flat_map(move |b| (Just(b), b..=extent)))
            .collect();
        ranges.prop_map(move |ranges| {
            let begin: [usize; D] = std::array::from_fn(|axis| ranges[axis].0);
            let end: [usize; D] = std::array::from_fn(|axis| ranges[axis].1);
            (tile, Index::new(begin), Index::new(end))
        })
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    proptest! {
        #[test]
        fn layouts_are_permutations(layout in gen_layout::<5>()) {
            let axes: HashSet<_> = layout.iter().copied().collect();
            prop_assert_eq!(axes, (0..5).collect::<HashSet<_>>());
        }

        #[test]
        fn regions_lie_within_tiles((tile, begin, end) in gen_tile_and_region::<3>(4)) {
            for axis in 0..3 {
                prop_assert!(begin[axis] <= end[axis]);
                prop_assert!(end[axis] <= tile.shape()[axis]);
            }
        }
    }
}
