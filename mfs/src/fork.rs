// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};

use crate::{AllocationMap, Error, Geometry};

/// Which of a file's two forks to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForkKind {
    Data,
    Resource,
}

/// The contents of one fork.
///
/// This is read in full when the fork is opened, so reading from it never touches the volume.
#[derive(Clone, Debug, Default)]
pub struct Fork {
    inner: Cursor<Vec<u8>>,
}

impl Fork {
    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl From<Vec<u8>> for Fork {
    fn from(data: Vec<u8>) -> Self {
        Self { inner: Cursor::new(data) }
    }
}

impl Read for Fork {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for Fork {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Seek for Fork {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Assembles forks out of allocation blocks.
pub struct ForkReader<'a, R> {
    source: &'a mut R,
    geometry: &'a Geometry,
    map: &'a AllocationMap,
}

impl<'a, R: Read + Seek> ForkReader<'a, R> {
    pub fn new(source: &'a mut R, geometry: &'a Geometry, map: &'a AllocationMap) -> Self {
        Self { source, geometry, map }
    }

    /// Reads the `logical_length` bytes of the fork that begins at `start_block`.
    ///
    /// The whole chain is resolved against the allocation map before any block is read, so a
    /// damaged chain fails without I/O.
    pub fn open(&mut self, start_block: u16, logical_length: u32) -> Result<Fork, Error> {
        if logical_length == 0 {
            return Ok(Fork::default());
        }

        let blocks = self.map.chain(start_block).collect::<Result<Vec<u16>, Error>>()?;

        let block_size = self.geometry.allocation_block_size;
        let available = blocks.len() as u64 * u64::from(block_size);
        if available < u64::from(logical_length) {
            return Err(Error::ShortChain {
                expected: logical_length,
                actual: available,
            });
        }
        tracing::debug!(
            "reading {} bytes from {} blocks starting at {}",
            logical_length,
            blocks.len(),
            start_block,
        );

        // Never read past the logical length. The slack of the last block may be absent.
        let mut data = Vec::with_capacity(logical_length as usize);
        let mut remaining = u64::from(logical_length);
        for block in blocks {
            if remaining == 0 {
                break;
            }
            let offset = self.geometry.allocation_block_offset(block);
            tracing::trace!("allocation block {} @ {:#x}", block, offset);

            self.source.seek(SeekFrom::Start(offset))?;
            let read_len = u64::from(block_size).min(remaining);
            let end = data.len();
            data.resize(end + read_len as usize, 0);
            self.source.read_exact(&mut data[end..])?;
            remaining -= read_len;
        }

        Ok(Fork::from(data))
    }
}
