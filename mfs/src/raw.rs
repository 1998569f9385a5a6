// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk record layouts, field for field.
//!
//! These are decoded with [`crate::de`] and then validated into the public types. Names follow
//! the classic Toolbox field names where that helps to read along: `drXxx` for the volume
//! information and `flXxx` for directory records.

use std::fmt;

use derivative::Derivative;
use serde::Deserialize;

use crate::roman;

/// The size of [`RawHeader`].
pub const HEADER_LEN: usize = 64;

/// The size of [`RawEntry`], a directory record whose name field is full.
pub const RECORD_MAX_LEN: usize = 82;

/// A length-prefixed string stored in a fixed field of `SIZE` bytes.
#[derive(Clone, Copy, Deserialize)]
pub struct PStrBuf<const SIZE: usize> {
    // This has to go through `serde_arrays` because *serde* can't derive for const-generic arrays.
    #[serde(with = "serde_arrays")]
    inner: [u8; SIZE],
}

impl<const SIZE: usize> PStrBuf<SIZE> {
    /// The declared length, which may exceed what the field can hold.
    pub fn len_byte(&self) -> u8 {
        self.inner.first().copied().unwrap_or(0)
    }

    /// The string's bytes, or `None` if the length byte runs past the end of the field.
    ///
    /// Whatever follows the string inside the field is ignored.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.inner.get(1..=usize::from(self.len_byte()))
    }
}

impl<const SIZE: usize> fmt::Debug for PStrBuf<SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(bytes) = self.as_bytes() {
            write!(f, "{:?}", roman::decode(bytes))
        } else {
            <[u8; SIZE] as fmt::Debug>::fmt(&self.inner, f)
        }
    }
}

/// A four-character code, as used for file types and creators.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&roman::decode(&self.0))
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

/// A QuickDraw point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Point {
    pub v: i16,
    pub h: i16,
}

/// What the Finder knows about a file (`flUsrWds`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FinderInfo {
    pub file_type: FourCc,
    pub creator: FourCc,
    pub flags: u16,
    /// Where the file's icon sits in its window.
    pub location: Point,
    /// The folder the file appears in. MFS has no real folders; the Finder fakes them.
    pub folder: i16,
}

/// One fork's placement (`flStBlk`/`flLgLen`/`flPyLen` and the resource-fork equivalents).
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RawExtent {
    pub start_block: u16,
    pub logical_len: u32,
    pub physical_len: u32,
}

/// The volume information (`drXxx`), at [`crate::HEADER_OFFSET`].
#[derive(Derivative, Deserialize)]
#[derivative(Debug)]
pub struct RawHeader {
    #[derivative(Debug(format_with = "fmt_hex"))]
    pub signature: u16,
    pub created: u32,
    pub last_backup: u32,
    #[derivative(Debug(format_with = "fmt_hex"))]
    pub attributes: u16,
    pub file_count: u16,
    pub dir_start: u16,
    pub dir_len: u16,
    pub alloc_block_count: u16,
    pub alloc_block_size: u32,
    pub clump_size: u32,
    pub alloc_start: u16,
    pub next_file_number: u32,
    pub free_blocks: u16,
    pub name: PStrBuf<28>,
}

/// A directory record (`flXxx`), read as if its name field were full.
#[derive(Derivative, Deserialize)]
#[derivative(Debug)]
pub struct RawEntry {
    #[derivative(Debug(format_with = "fmt_hex"))]
    pub flags: u8,
    // Always zero on shipped volumes.
    #[derivative(Debug = "ignore")]
    pub version: u8,
    pub finder_info: FinderInfo,
    pub file_number: u32,
    pub data: RawExtent,
    pub resource: RawExtent,
    pub created: u32,
    pub modified: u32,
    pub name: PStrBuf<32>,
}

fn fmt_hex<T: fmt::LowerHex>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:#x}", value)
}
