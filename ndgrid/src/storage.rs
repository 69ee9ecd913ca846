/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Physical storage for grids.
//!
//! A storage object exclusively owns a contiguous extent of bytes and
//! lends it out as a byte slice; it never hands out raw pointers. Two
//! families are provided:
//!
//! - [`Heap`]: a transient, zero-filled allocation.
//! - [`Direct`] and [`ConstDirect`]: a file mapped into the address
//!   space, read/write and read-only respectively.
//!
//! Mapped storage follows a create-then-open protocol: one step (or
//! process) sizes the backing file with [`Direct::create`], another
//! maps it with [`Direct::open`]. The mapping is released when the
//! storage object is dropped, on every exit path.
//!
//! Mapping the same file through more than one [`Direct`] at a time
//! (in this process or another) is the caller's responsibility: writes
//! to overlapping regions through independent mappings are not
//! arbitrated here. Disjoint regions may be written independently.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use memmap2::Mmap;
use memmap2::MmapMut;
use memmap2::MmapOptions;

use crate::config::StorageConfig;
use crate::error::ErrorKind;

/// The type of error for storage operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("no backing file at {}", .uri.display())]
    Missing { uri: PathBuf },

    #[error("{} holds {actual} bytes, expected {expected}", .uri.display())]
    SizeMismatch {
        uri: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("failed to {op} {}", .uri.display())]
    Io {
        op: &'static str,
        uri: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}

fn io_error<'a>(op: &'static str, uri: &'a Path) -> impl FnOnce(io::Error) -> StorageError + 'a {
    move |source| StorageError::Io {
        op,
        uri: uri.to_path_buf(),
        source,
    }
}

/// A contiguous, exclusively owned extent of bytes.
pub trait Storage {
    /// The whole extent.
    fn bytes(&self) -> &[u8];

    /// The length of the extent in bytes.
    fn byte_size(&self) -> usize {
        self.bytes().len()
    }

    /// Whether the contents outlive this object.
    fn is_persistent(&self) -> bool {
        false
    }

    /// Push outstanding writes to the backing store, if there is one.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Storage whose extent may be written.
pub trait StorageMut: Storage {
    fn bytes_mut(&mut self) -> &mut [u8];
}

/// Transient storage on the heap.
///
/// The extent is zero-filled and aligned to 16 bytes, so that any
/// primitive scalar (including `u128`) can be laid over it.
#[derive(Clone, Debug)]
pub struct Heap {
    words: Box<[u128]>,
    byte_size: usize,
}

impl Heap {
    /// Allocate `byte_size` zeroed bytes.
    pub fn new(byte_size: usize) -> Self {
        Self {
            words: vec![0u128; byte_size.div_ceil(16)].into_boxed_slice(),
            byte_size,
        }
    }
}

impl Storage for Heap {
    fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u128, u8>(&self.words)[..self.byte_size]
    }

    fn byte_size(&self) -> usize {
        self.byte_size
    }
}

impl StorageMut for Heap {
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u128, u8>(&mut self.words)[..self.byte_size]
    }
}

/// Open the file at `uri`, checking that it holds exactly `byte_size`
/// bytes.
fn open_sized(uri: &Path, byte_size: usize, writable: bool) -> Result<File, StorageError> {
    let file = match OpenOptions::new().read(true).write(writable).open(uri) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::Missing {
                uri: uri.to_path_buf(),
            });
        }
        Err(err) => return Err(io_error("open", uri)(err)),
    };
    let actual = file.metadata().map_err(io_error("stat", uri))?.len();
    let expected = byte_size as u64;
    if actual != expected {
        return Err(StorageError::SizeMismatch {
            uri: uri.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(file)
}

/// A file mapped read/write into the address space.
///
/// ```no_run
/// # use ndgrid::{Direct, Storage};
/// # fn main() -> Result<(), ndgrid::StorageError> {
/// Direct::create("grid.dat", 960)?;
/// let storage = Direct::open("grid.dat", 960)?;
/// assert_eq!(storage.byte_size(), 960);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Direct {
    uri: PathBuf,
    map: MmapMut,
    flush_on_drop: bool,
}

impl Direct {
    /// Create the file at `uri`, or truncate an existing one, so that
    /// it holds exactly `byte_size` zero bytes. Any previous contents
    /// are lost. The file is not mapped.
    pub fn create(uri: impl AsRef<Path>, byte_size: usize) -> Result<(), StorageError> {
        let uri = uri.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(uri)
            .map_err(io_error("create", uri))?;
        file.set_len(byte_size as u64)
            .map_err(io_error("resize", uri))?;
        tracing::debug!(uri = %uri.display(), byte_size, "created backing file");
        Ok(())
    }

    /// Map the existing file at `uri`, which must hold exactly
    /// `byte_size` bytes, with the default [`StorageConfig`].
    pub fn open(uri: impl AsRef<Path>, byte_size: usize) -> Result<Self, StorageError> {
        Self::open_with(uri, byte_size, &StorageConfig::default())
    }

    /// Map the existing file at `uri`, which must hold exactly
    /// `byte_size` bytes.
    pub fn open_with(
        uri: impl AsRef<Path>,
        byte_size: usize,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let uri = uri.as_ref();
        let file = open_sized(uri, byte_size, true)?;
        let mut options = MmapOptions::new();
        options.len(byte_size);
        if config.populate {
            options.populate();
        }
        // SAFETY: the mapping is owned by the returned object and is
        // only reachable through borrows of it. Concurrent modification
        // of the file by other mappings is a documented caller
        // obligation.
        let map = unsafe { options.map_mut(&file) }.map_err(io_error("map", uri))?;
        tracing::debug!(uri = %uri.display(), byte_size, "mapped backing file read/write");
        Ok(Self {
            uri: uri.to_path_buf(),
            map,
            flush_on_drop: config.flush_on_drop,
        })
    }

    /// The path of the backing file.
    pub fn uri(&self) -> &Path {
        &self.uri
    }

    /// Flush and unmap, reporting a failed flush instead of logging it.
    pub fn close(mut self) -> Result<(), StorageError> {
        self.map.flush().map_err(io_error("flush", &self.uri))?;
        self.flush_on_drop = false;
        Ok(())
    }
}

impl Storage for Direct {
    fn bytes(&self) -> &[u8] {
        &self.map
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.map.flush().map_err(io_error("flush", &self.uri))
    }
}

impl StorageMut for Direct {
    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.map
    }
}

impl Drop for Direct {
    fn drop(&mut self) {
        if self.flush_on_drop {
            if let Err(err) = self.map.flush() {
                tracing::error!(
                    "failed to flush {} before unmapping: {}",
                    self.uri.display(),
                    err
                );
            }
        }
        tracing::debug!(uri = %self.uri.display(), "unmapping backing file");
    }
}

/// A file mapped read-only into the address space.
#[derive(Debug)]
pub struct ConstDirect {
    uri: PathBuf,
    map: Mmap,
}

impl ConstDirect {
    /// Map the existing file at `uri`, which must hold exactly
    /// `byte_size` bytes.
    pub fn open(uri: impl AsRef<Path>, byte_size: usize) -> Result<Self, StorageError> {
        Self::open_with(uri, byte_size, &StorageConfig::default())
    }

    pub fn open_with(
        uri: impl AsRef<Path>,
        byte_size: usize,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let uri = uri.as_ref();
        let file = open_sized(uri, byte_size, false)?;
        let mut options = MmapOptions::new();
        options.len(byte_size);
        if config.populate {
            options.populate();
        }
        // SAFETY: as for `Direct::open_with`; the file must not be
        // truncated while mapped.
        let map = unsafe { options.map(&file) }.map_err(io_error("map", uri))?;
        tracing::debug!(uri = %uri.display(), byte_size, "mapped backing file read-only");
        Ok(Self {
            uri: uri.to_path_buf(),
            map,
        })
    }

    pub fn uri(&self) -> &Path {
        &self.uri
    }
}

impl Storage for ConstDirect {
    fn bytes(&self) -> &[u8] {
        &self.map
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
