// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only access to Macintosh File System (MFS) volumes.
//!
//! MFS is the flat, single-directory file system that shipped with the first Macintosh. A volume
//! is laid out as follows, in 512-byte logical blocks:
//!
//! - blocks 0 and 1 are boot blocks and are not interpreted here;
//! - block 2 holds the volume information ("header"), immediately followed by the allocation
//!   block map, a packed array of 12-bit links;
//! - the file directory begins at the block named by the header;
//! - allocation blocks, where fork contents live, follow the directory.
//!
//! Every file owns two forks, each a chain of allocation blocks linked through the map.
//!
//! ```no_run
//! use std::fs::File;
//!
//! let image = File::open("System Disk.img")?;
//! let mut volume = mfs::Volume::open(image)?;
//! for (index, file) in volume.files().to_vec().iter().enumerate() {
//!     let data = volume.open_data_fork(index)?;
//!     println!("{} ({} bytes)", file.name, data.len());
//! }
//! # Ok::<(), mfs::Error>(())
//! ```

mod alloc;
mod de;
mod dir;
mod fork;
mod header;
mod raw;
mod roman;
mod time;
mod volume;

use std::{fmt, io};

pub use alloc::{AllocationMap, Chain};
pub use de::DeserializeError;
pub use dir::{frame_delta, parse_directory, Extent, FileDescriptor, FileFlags};
pub use fork::{Fork, ForkKind, ForkReader};
pub use header::{decode_header, Geometry, VolumeAttributes};
pub use raw::{FinderInfo, FourCc, Point};
pub use time::mac_to_unix;
pub use volume::Volume;

/// The size, in bytes, of a logical block. All absolute offsets are multiples of this.
pub const LOGICAL_BLOCK_SIZE: u64 = 512;

/// The byte offset of the volume information.
pub const HEADER_OFFSET: u64 = 2 * LOGICAL_BLOCK_SIZE;

/// The magic number that opens the volume information of every MFS volume.
pub const SIGNATURE: u16 = 0xd2d7;

/// Seconds between 1904-01-01 (the Macintosh epoch) and 1970-01-01 (the Unix epoch).
pub const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

/// The longest file name a directory record can hold.
pub const MAX_NAME_LEN: u8 = 31;

/// The longest volume name the volume information can hold.
pub const MAX_VOLUME_NAME_LEN: u8 = 27;

/// The allocation map value that ends a fork's chain of blocks.
pub const TERMINAL_BLOCK: u16 = 1;

/// The number of the first allocation block. The map's entry 0 describes this block.
pub const FIRST_ALLOCATION_BLOCK: u16 = 2;

/// If fewer than this many bytes would remain in a logical block after a directory record, the
/// rest of the block is padding.
///
/// This is smaller than the fixed part of a record, but it is what real directories were laid
/// out against, so it must not be derived from the record layout.
pub const FRAME_THRESHOLD: u64 = 52;

/// The broad classes of failure, independent of the exact cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte source could not be read or seeked.
    Io,
    /// The image is not an MFS volume or is structurally damaged.
    Format,
    /// A file index was out of range.
    Index,
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Deserialize(DeserializeError),
    /// The volume information does not start with [`SIGNATURE`].
    InvalidSignature(u16),
    VolumeNameTooLong(u8),
    /// The allocation block size is zero or not a whole number of logical blocks.
    InvalidBlockSize(u32),
    /// A directory record declares a name longer than [`MAX_NAME_LEN`].
    NameTooLong(u8),
    /// A fork's chain names a block that has no allocation map entry.
    BlockOutOfRange { block: u16, count: u16 },
    /// A fork's chain visits more blocks than the volume has, so it must contain a cycle.
    UnterminatedChain { start: u16 },
    /// A fork's chain ends before covering the fork's logical length.
    ShortChain { expected: u32, actual: u64 },
    NoSuchFile { index: usize, count: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::NoSuchFile { .. } => ErrorKind::Index,
            Self::Deserialize(_)
            | Self::InvalidSignature(_)
            | Self::VolumeNameTooLong(_)
            | Self::InvalidBlockSize(_)
            | Self::NameTooLong(_)
            | Self::BlockOutOfRange { .. }
            | Self::UnterminatedChain { .. }
            | Self::ShortChain { .. } => ErrorKind::Format,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DeserializeError> for Error {
    fn from(e: DeserializeError) -> Self {
        Self::Deserialize(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Deserialize(e) => write!(f, "malformed record: {}", e),
            Self::InvalidSignature(sig) => {
                write!(f, "invalid volume signature {:#06x} (expected {:#06x})", sig, SIGNATURE)
            }
            Self::VolumeNameTooLong(len) => {
                write!(f, "volume name length {} exceeds {}", len, MAX_VOLUME_NAME_LEN)
            }
            Self::InvalidBlockSize(size) => write!(
                f,
                "allocation block size {} is not a nonzero multiple of {}",
                size,
                LOGICAL_BLOCK_SIZE,
            ),
            Self::NameTooLong(len) => write!(f, "file name length {} exceeds {}", len, MAX_NAME_LEN),
            Self::BlockOutOfRange { block, count } => write!(
                f,
                "allocation block {} is outside of {}..={}",
                block,
                FIRST_ALLOCATION_BLOCK,
                u32::from(*count) + 1,
            ),
            Self::UnterminatedChain { start } => {
                write!(f, "block chain starting at {} does not terminate", start)
            }
            Self::ShortChain { expected, actual } => write!(
                f,
                "block chain holds {} bytes but the fork is {} bytes long",
                actual,
                expected,
            ),
            Self::NoSuchFile { index, count } => {
                write!(f, "file index {} is out of range (volume has {} files)", index, count)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Deserialize(e) => Some(e),
            _ => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        let io = Error::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(Error::InvalidSignature(0).kind(), ErrorKind::Format);
        assert_eq!(Error::NameTooLong(40).kind(), ErrorKind::Format);
        assert_eq!(Error::InvalidBlockSize(0).kind(), ErrorKind::Format);
        assert_eq!(Error::UnterminatedChain { start: 2 }.kind(), ErrorKind::Format);
        assert_eq!(Error::NoSuchFile { index: 3, count: 1 }.kind(), ErrorKind::Index);
    }

    #[test]
    fn signature_message_names_both_values() {
        let msg = Error::InvalidSignature(0x4244).to_string();
        assert!(msg.contains("0x4244"), "{}", msg);
        assert!(msg.contains("0xd2d7"), "{}", msg);
    }
}
