// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The allocation block map.
//!
//! The map is an array of 12-bit entries, one per allocation block, packed two to every three
//! bytes. Entry `i` describes block `i + 2`: `0` if the block is free, [`TERMINAL_BLOCK`] if it
//! ends a fork, and otherwise the number of the fork's next block. Chains are stored as indices
//! into the map, never followed blindly; a damaged map can contain cycles.

use std::io::{self, Read};

use crate::{Error, FIRST_ALLOCATION_BLOCK, TERMINAL_BLOCK};

/// The number of bytes `count` packed entries occupy.
pub const fn packed_len(count: usize) -> usize {
    (count / 2) * 3 + (count % 2) * 2
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationMap {
    entries: Vec<u16>,
}

impl AllocationMap {
    /// Reads `count` packed entries from the current position of `source`.
    ///
    /// The map immediately follows the volume information, so this does not seek.
    pub fn decode(source: &mut impl Read, count: u16) -> Result<Self, Error> {
        let mut packed = vec![0; packed_len(usize::from(count))];
        source.read_exact(&mut packed)?;

        let map = Self::unpack(&packed, usize::from(count))
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        tracing::debug!(
            "allocation map: {} entries, {} unused",
            map.len(),
            map.unused_count(),
        );

        Ok(map)
    }

    /// Unpacks `count` entries from `bytes`, or returns `None` if `bytes` is too short.
    pub fn unpack(bytes: &[u8], count: usize) -> Option<Self> {
        let mut bytes = bytes.iter().copied();
        let mut entries = Vec::with_capacity(count);

        // The low nibble of every second byte belongs to the following (odd) entry.
        let mut carry = 0u8;
        for i in 0..count {
            let entry = if i % 2 == 0 {
                let (a, b) = (bytes.next()?, bytes.next()?);
                carry = b;

                (u16::from(a) << 4) | (u16::from(b) >> 4)
            } else {
                let c = bytes.next()?;

                (u16::from(carry & 0x0f) << 8) | u16::from(c)
            };
            entries.push(entry);
        }

        Some(Self { entries })
    }

    pub fn from_entries(entries: Vec<u16>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[u16] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `block` has an entry, i.e. is within `2..=len + 1`.
    pub fn contains(&self, block: u16) -> bool {
        self.index_of(block).is_some()
    }

    fn index_of(&self, block: u16) -> Option<usize> {
        let index = usize::from(block.checked_sub(FIRST_ALLOCATION_BLOCK)?);

        (index < self.entries.len()).then_some(index)
    }

    /// The entry for `block`: the next block of its chain, [`TERMINAL_BLOCK`], or `0`.
    pub fn next(&self, block: u16) -> Result<u16, Error> {
        self.index_of(block)
            .map(|index| self.entries[index])
            .ok_or(Error::BlockOutOfRange {
                block,
                count: self.count(),
            })
    }

    /// Follows the chain that begins at `start`.
    pub fn chain(&self, start: u16) -> Chain<'_> {
        Chain {
            map: self,
            start,
            cursor: Some(start),
            hops: 0,
        }
    }

    /// The number of free blocks.
    pub fn unused_count(&self) -> usize {
        self.entries.iter().filter(|&&entry| entry == 0).count()
    }

    fn count(&self) -> u16 {
        u16::try_from(self.entries.len()).unwrap_or(u16::MAX)
    }
}

/// The blocks of one fork, in order.
///
/// Yields an error, and then stops, if the chain leaves the map or visits more blocks than the map
/// has (which can only happen if it loops).
#[derive(Clone, Debug)]
pub struct Chain<'a> {
    map: &'a AllocationMap,
    start: u16,
    cursor: Option<u16>,
    hops: usize,
}

impl Iterator for Chain<'_> {
    type Item = Result<u16, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.cursor.take()?;

        if self.hops == self.map.len() {
            return Some(Err(Error::UnterminatedChain { start: self.start }));
        }

        let next = match self.map.next(block) {
            Ok(it) => it,
            Err(e) => return Some(Err(e)),
        };
        self.hops += 1;
        tracing::trace!("block {} -> {}", block, next);

        if next != TERMINAL_BLOCK {
            self.cursor = Some(next);
        }

        Some(Ok(block))
    }
}
