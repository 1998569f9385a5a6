// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthetic MFS images for tests.

#![allow(dead_code)]

use std::{
    cell::Cell,
    io::{self, Read, Seek, SeekFrom},
    rc::Rc,
    sync::Once,
};

use tracing_subscriber::EnvFilter;

pub const DIR_START_BLOCK: u16 = 4;
pub const DIR_BLOCK_LEN: u16 = 4;
pub const MAP_OFFSET: usize = 1024 + 64;

const DIR_OFFSET: usize = DIR_START_BLOCK as usize * 512;
const ALLOC_OFFSET: usize = (DIR_START_BLOCK + DIR_BLOCK_LEN) as usize * 512;

/// Routes `tracing` output to the test harness. Set `RUST_LOG` to see it.
pub fn init_logging() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .with_target(false)
            .without_time()
            .try_init();
    });
}

#[derive(Clone)]
pub struct FileSpec {
    pub name: Vec<u8>,
    pub file_type: [u8; 4],
    pub creator: [u8; 4],
    pub data: Vec<u8>,
    pub resource: Vec<u8>,
    pub created: u32,
    pub modified: u32,
}

impl FileSpec {
    pub fn new(name: &[u8], data: Vec<u8>, resource: Vec<u8>) -> Self {
        Self {
            name: name.to_vec(),
            file_type: *b"TEXT",
            creator: *b"MACA",
            data,
            resource,
            // 1985-01-01 and 1986-01-01.
            created: 2_556_230_400,
            modified: 2_587_766_400,
        }
    }
}

pub struct ImageBuilder {
    volume_name: Vec<u8>,
    block_size: u32,
    block_count: u16,
    files: Vec<FileSpec>,
}

impl ImageBuilder {
    pub fn new(volume_name: &[u8]) -> Self {
        Self {
            volume_name: volume_name.to_vec(),
            block_size: 1024,
            block_count: 40,
            files: Vec::new(),
        }
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn block_count(mut self, block_count: u16) -> Self {
        self.block_count = block_count;
        self
    }

    pub fn file(mut self, spec: FileSpec) -> Self {
        self.files.push(spec);
        self
    }

    pub fn build(&self) -> Image {
        let block_size = self.block_size as usize;
        let image_len = ALLOC_OFFSET + (usize::from(self.block_count) + 2) * block_size;
        let mut image = Image {
            bytes: vec![0; image_len],
            map: vec![0; usize::from(self.block_count)],
            starts: Vec::new(),
            record_offsets: Vec::new(),
        };

        let mut next_free = 2u16;
        let mut records = Vec::new();
        for (i, spec) in self.files.iter().enumerate() {
            let data = image.allocate(&spec.data, &mut next_free, block_size);
            let resource = image.allocate(&spec.resource, &mut next_free, block_size);
            image.starts.push((data.0, resource.0));
            records.push(record(i as u32 + 1, spec, data, resource));
        }

        let mut offset = DIR_OFFSET;
        for rec in &records {
            assert!(offset % 512 + rec.len() <= 512, "record at {:#x} straddles a block", offset);
            assert!(offset + 82 <= ALLOC_OFFSET, "directory is full");
            image.bytes[offset..offset + rec.len()].copy_from_slice(rec);
            image.record_offsets.push(offset);

            // Where the reader will look for the next record.
            let after_read = offset + 82;
            offset = if (after_read + 52) % 512 < 52 {
                after_read + 512 - after_read % 512
            } else {
                offset + rec.len()
            };
        }

        let header = self.header(next_free - 2);
        image.bytes[1024..1024 + header.len()].copy_from_slice(&header);
        image.repack();

        image
    }

    fn header(&self, used_blocks: u16) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(&0xd2d7u16.to_be_bytes());
        h.extend_from_slice(&2_556_230_400u32.to_be_bytes());
        h.extend_from_slice(&0u32.to_be_bytes());
        h.extend_from_slice(&0u16.to_be_bytes());
        h.extend_from_slice(&(self.files.len() as u16).to_be_bytes());
        h.extend_from_slice(&DIR_START_BLOCK.to_be_bytes());
        h.extend_from_slice(&DIR_BLOCK_LEN.to_be_bytes());
        h.extend_from_slice(&self.block_count.to_be_bytes());
        h.extend_from_slice(&self.block_size.to_be_bytes());
        h.extend_from_slice(&self.block_size.to_be_bytes());
        h.extend_from_slice(&(DIR_START_BLOCK + DIR_BLOCK_LEN).to_be_bytes());
        h.extend_from_slice(&(self.files.len() as u32 + 1).to_be_bytes());
        h.extend_from_slice(&(self.block_count - used_blocks).to_be_bytes());
        let mut name = [0; 28];
        name[0] = self.volume_name.len() as u8;
        name[1..=self.volume_name.len()].copy_from_slice(&self.volume_name);
        h.extend_from_slice(&name);
        assert_eq!(h.len(), 64);

        h
    }
}

/// A built image, plus what the builder decided about its layout.
pub struct Image {
    pub bytes: Vec<u8>,
    /// One entry per allocation block, starting with block 2.
    pub map: Vec<u16>,
    /// The data and resource start blocks of each file, `0` for empty forks.
    pub starts: Vec<(u16, u16)>,
    pub record_offsets: Vec<usize>,
}

impl Image {
    /// Returns `(start_block, physical_length)`.
    fn allocate(&mut self, contents: &[u8], next_free: &mut u16, block_size: usize) -> (u16, u32) {
        if contents.is_empty() {
            return (0, 0);
        }

        let start = *next_free;
        let chunks: Vec<&[u8]> = contents.chunks(block_size).collect();
        for (i, chunk) in chunks.iter().enumerate() {
            let block = start + i as u16;
            let offset = ALLOC_OFFSET + usize::from(block) * block_size;
            self.bytes[offset..offset + chunk.len()].copy_from_slice(chunk);
            self.map[usize::from(block) - 2] = if i + 1 == chunks.len() { 1 } else { block + 1 };
        }
        *next_free += chunks.len() as u16;

        (start, (chunks.len() * block_size) as u32)
    }

    /// Writes `map` back into the packed allocation map.
    pub fn repack(&mut self) {
        let packed = pack(&self.map);
        self.bytes[MAP_OFFSET..MAP_OFFSET + packed.len()].copy_from_slice(&packed);
    }

    pub fn cursor(&self) -> io::Cursor<Vec<u8>> {
        io::Cursor::new(self.bytes.clone())
    }
}

/// Packs 12-bit entries two to every three bytes.
pub fn pack(entries: &[u16]) -> Vec<u8> {
    let mut out = Vec::new();
    for pair in entries.chunks(2) {
        let a = pair[0];
        out.push((a >> 4) as u8);
        match pair.get(1) {
            Some(&b) => {
                out.push((((a & 0x0f) << 4) | (b >> 8)) as u8);
                out.push(b as u8);
            }
            None => out.push(((a & 0x0f) << 4) as u8),
        }
    }

    out
}

fn record(file_number: u32, spec: &FileSpec, data: (u16, u32), resource: (u16, u32)) -> Vec<u8> {
    let mut rec = vec![0x80, 0x00];
    rec.extend_from_slice(&spec.file_type);
    rec.extend_from_slice(&spec.creator);
    // Finder flags, icon location and folder.
    rec.extend_from_slice(&[0x01, 0x00, 0x00, 0x10, 0x00, 0x20, 0xff, 0xfe]);
    rec.extend_from_slice(&file_number.to_be_bytes());
    for ((start, physical), len) in [(data, spec.data.len()), (resource, spec.resource.len())] {
        rec.extend_from_slice(&start.to_be_bytes());
        rec.extend_from_slice(&(len as u32).to_be_bytes());
        rec.extend_from_slice(&physical.to_be_bytes());
    }
    rec.extend_from_slice(&spec.created.to_be_bytes());
    rec.extend_from_slice(&spec.modified.to_be_bytes());
    rec.push(spec.name.len() as u8);
    rec.extend_from_slice(&spec.name);
    if rec.len() % 2 == 1 {
        rec.push(0);
    }

    rec
}

/// Deterministic filler so that misplaced reads show up as content mismatches.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// A source that counts the reads made through it.
pub struct CountingSource<R> {
    inner: R,
    reads: Rc<Cell<usize>>,
}

impl<R> CountingSource<R> {
    pub fn new(inner: R) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));

        (Self { inner, reads: Rc::clone(&reads) }, reads)
    }
}

impl<R: Read> Read for CountingSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for CountingSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
