/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::fmt;

/// The broad class of an error raised by this crate.
///
/// Every error type in the crate reports one of these through its
/// `kind()` method, so callers can tell construction-time misuse from
/// per-access bounds failures and storage failures without matching on
/// individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A malformed layout, shape, slice, or a storage extent whose
    /// size disagrees with the tile bound to it. Always detected at
    /// construction.
    Configuration,
    /// An index or offset outside the tile.
    OutOfBounds,
    /// A missing or mis-sized backing file, or a failed map, flush or
    /// unmap.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::OutOfBounds => write!(f, "out of bounds"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}
