// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The file directory.
//!
//! A directory record is 50 fixed bytes followed by a length-prefixed name, padded to an even
//! size. Records do not cross logical block boundaries. Rather than decoding variable-size
//! records, we read every record as if its name were the longest possible, then move the cursor
//! back to where the record really ended.

use std::io::{Read, Seek, SeekFrom};

use chrono::{DateTime, Utc};

use crate::{
    de,
    raw::{FinderInfo, RawEntry, RawExtent, RECORD_MAX_LEN},
    roman,
    time::mac_time,
    Error,
    Geometry,
    FRAME_THRESHOLD,
    LOGICAL_BLOCK_SIZE,
    MAX_NAME_LEN,
};

bitfield::bitfield! {
    /// The flags byte of a directory record (`flFlags`).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags(u8);
    impl Debug;
    pub is_locked, _: 0;
    pub is_used, _: 7;
}

/// Where a fork lives and how long it is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extent {
    /// The first allocation block of the fork.
    pub start_block: u16,
    /// The length of the fork's contents.
    pub logical_length: u32,
    /// The number of bytes allocated to the fork, a whole number of allocation blocks.
    pub physical_length: u32,
}

impl From<RawExtent> for Extent {
    fn from(raw: RawExtent) -> Self {
        Self {
            start_block: raw.start_block,
            logical_length: raw.logical_len,
            physical_length: raw.physical_len,
        }
    }
}

/// One file of the directory.
#[derive(Clone, Debug)]
pub struct FileDescriptor {
    pub name: String,
    /// The name exactly as stored, without its length byte.
    pub raw_name: Vec<u8>,
    pub file_type: String,
    pub creator: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub data_fork: Extent,
    pub resource_fork: Extent,
    pub flags: FileFlags,
    pub version: u8,
    pub file_number: u32,
    pub finder_info: FinderInfo,
}

impl TryFrom<RawEntry> for FileDescriptor {
    type Error = Error;

    fn try_from(raw: RawEntry) -> Result<Self, Error> {
        let name_len = raw.name.len_byte();
        let raw_name = match raw.name.as_bytes() {
            Some(bytes) if name_len <= MAX_NAME_LEN => bytes.to_vec(),
            _ => return Err(Error::NameTooLong(name_len)),
        };

        Ok(Self {
            name: roman::decode(&raw_name),
            raw_name,
            file_type: raw.finder_info.file_type.to_string(),
            creator: raw.finder_info.creator.to_string(),
            created: mac_time(raw.created),
            modified: mac_time(raw.modified),
            data_fork: raw.data.into(),
            resource_fork: raw.resource.into(),
            flags: FileFlags(raw.flags),
            version: raw.version,
            file_number: raw.file_number,
            finder_info: raw.finder_info,
        })
    }
}

/// How far to move the cursor after reading a record with a name of `name_len` bytes, to land on
/// the next record.
///
/// The record really occupied `50 + 1 + name_len` bytes, rounded up to an even number; we read
/// [`RECORD_MAX_LEN`]. The result is never positive.
pub const fn frame_delta(name_len: u8) -> i64 {
    let unused = MAX_NAME_LEN as i64 - name_len as i64;
    let pad = if name_len % 2 == 0 { 1 } else { 0 };

    pad - unused
}

/// If a record ending at `offset` leaves too little of its logical block for another record, the
/// distance to the next block.
pub const fn block_skip(offset: u64) -> Option<u64> {
    if (offset + FRAME_THRESHOLD) % LOGICAL_BLOCK_SIZE < FRAME_THRESHOLD {
        Some(LOGICAL_BLOCK_SIZE - offset % LOGICAL_BLOCK_SIZE)
    } else {
        None
    }
}

/// Reads `geometry.file_count` records, starting at the directory's first block.
pub fn parse_directory(
    source: &mut (impl Read + Seek),
    geometry: &Geometry,
) -> Result<Vec<FileDescriptor>, Error> {
    source.seek(SeekFrom::Start(geometry.directory_offset()))?;

    let mut files = Vec::with_capacity(usize::from(geometry.file_count));
    for index in 0..geometry.file_count {
        let mut buf = [0; RECORD_MAX_LEN];
        source.read_exact(&mut buf)?;

        let raw: RawEntry = de::from_bytes(&buf)?;
        tracing::trace!("directory record {}: {:#?}", index, raw);

        let file = FileDescriptor::try_from(raw)?;
        tracing::debug!(
            "file {}: {:?} ({}/{}), data {} bytes @ {}, resource {} bytes @ {}",
            index,
            file.name,
            file.file_type,
            file.creator,
            file.data_fork.logical_length,
            file.data_fork.start_block,
            file.resource_fork.logical_length,
            file.resource_fork.start_block,
        );

        let offset = source.stream_position()?;
        if let Some(skip) = block_skip(offset) {
            tracing::trace!("skipping {} bytes of padding at {:#x}", skip, offset);
            // `skip` is less than a logical block.
            source.seek(SeekFrom::Current(skip as i64))?;
        } else {
            // The name length was validated above.
            source.seek(SeekFrom::Current(frame_delta(file.raw_name.len() as u8)))?;
        }

        files.push(file);
    }

    Ok(files)
}
