// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{Read, Seek, SeekFrom};

use chrono::{DateTime, Utc};

use crate::{
    de,
    raw::{RawHeader, HEADER_LEN},
    roman,
    time::mac_time,
    Error,
    HEADER_OFFSET,
    LOGICAL_BLOCK_SIZE,
    MAX_VOLUME_NAME_LEN,
    SIGNATURE,
};

bitfield::bitfield! {
    /// The volume attribute word (`drAtrb`).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct VolumeAttributes(u16);
    impl Debug;
    pub is_hardware_locked, _: 7;
    pub is_software_locked, _: 15;
}

/// Volume geometry and metadata, from the volume information.
#[derive(Clone, Debug)]
pub struct Geometry {
    pub signature: u16,
    pub created: DateTime<Utc>,
    pub last_backup: DateTime<Utc>,
    pub attributes: VolumeAttributes,
    /// The number of directory records.
    pub file_count: u16,
    /// The logical block at which the directory begins.
    pub directory_start_block: u16,
    /// The number of logical blocks from the directory to the first allocation block.
    pub directory_block_length: u16,
    /// The number of allocation blocks, and of allocation map entries.
    pub allocation_block_count: u16,
    /// The size, in bytes, of an allocation block. A multiple of [`LOGICAL_BLOCK_SIZE`].
    pub allocation_block_size: u32,
    /// How many bytes the File Manager tried to allocate at once when the volume was written.
    pub clump_size: u32,
    pub allocation_start: u16,
    pub next_file_number: u32,
    /// Free allocation blocks, as recorded by whoever last wrote the volume.
    pub free_blocks: u16,
    pub volume_name: String,
}

impl Geometry {
    pub fn directory_offset(&self) -> u64 {
        u64::from(self.directory_start_block) * LOGICAL_BLOCK_SIZE
    }

    pub fn allocation_area_offset(&self) -> u64 {
        (u64::from(self.directory_start_block) + u64::from(self.directory_block_length))
            * LOGICAL_BLOCK_SIZE
    }

    /// The absolute byte offset of allocation block `block`.
    pub fn allocation_block_offset(&self, block: u16) -> u64 {
        self.allocation_area_offset() + u64::from(block) * u64::from(self.allocation_block_size)
    }
}

impl TryFrom<RawHeader> for Geometry {
    type Error = Error;

    fn try_from(raw: RawHeader) -> Result<Self, Error> {
        if raw.signature != SIGNATURE {
            return Err(Error::InvalidSignature(raw.signature));
        }

        let name_len = raw.name.len_byte();
        let volume_name = match raw.name.as_bytes() {
            Some(bytes) if name_len <= MAX_VOLUME_NAME_LEN => roman::decode(bytes),
            _ => return Err(Error::VolumeNameTooLong(name_len)),
        };

        let block_size = u64::from(raw.alloc_block_size);
        if block_size == 0 || block_size % LOGICAL_BLOCK_SIZE != 0 {
            return Err(Error::InvalidBlockSize(raw.alloc_block_size));
        }

        Ok(Self {
            signature: raw.signature,
            created: mac_time(raw.created),
            last_backup: mac_time(raw.last_backup),
            attributes: VolumeAttributes(raw.attributes),
            file_count: raw.file_count,
            directory_start_block: raw.dir_start,
            directory_block_length: raw.dir_len,
            allocation_block_count: raw.alloc_block_count,
            allocation_block_size: raw.alloc_block_size,
            clump_size: raw.clump_size,
            allocation_start: raw.alloc_start,
            next_file_number: raw.next_file_number,
            free_blocks: raw.free_blocks,
            volume_name,
        })
    }
}

/// Reads the volume information.
///
/// On success, `source` is left positioned at the allocation map.
pub fn decode_header(source: &mut (impl Read + Seek)) -> Result<Geometry, Error> {
    source.seek(SeekFrom::Start(HEADER_OFFSET))?;

    let mut buf = [0; HEADER_LEN];
    source.read_exact(&mut buf)?;

    let raw: RawHeader = de::from_bytes(&buf)?;
    tracing::debug!("volume information: {:#?}", raw);

    Geometry::try_from(raw)
}
