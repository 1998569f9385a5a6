// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::{Read, Seek};

use crate::{
    dir::{self, FileDescriptor},
    fork::{Fork, ForkKind, ForkReader},
    header,
    AllocationMap,
    Error,
    Geometry,
};

/// An MFS volume.
///
/// All metadata is read when the volume is opened. Fork contents are not cached: every
/// `open_*_fork` call reads from `R` again. Opening a fork moves the cursor of `R`, hence `&mut
/// self`; to read forks from several threads, open the image once per thread.
pub struct Volume<R> {
    source: R,
    geometry: Geometry,
    map: AllocationMap,
    files: Vec<FileDescriptor>,
}

impl<R: Read + Seek> Volume<R> {
    /// Reads the volume information, allocation map and directory from `source`.
    ///
    /// `source` must start where the volume starts; the first 1024 bytes (the boot blocks) are
    /// skipped. Pass `&mut R` to keep ownership of the source.
    pub fn open(mut source: R) -> Result<Self, Error> {
        let geometry = header::decode_header(&mut source)?;
        let map = AllocationMap::decode(&mut source, geometry.allocation_block_count)?;
        let files = dir::parse_directory(&mut source, &geometry)?;

        tracing::info!(
            "opened volume {:?}: {} files, {} x {}-byte allocation blocks",
            geometry.volume_name,
            files.len(),
            geometry.allocation_block_count,
            geometry.allocation_block_size,
        );

        Ok(Self { source, geometry, map, files })
    }

    pub fn open_fork(&mut self, index: usize, kind: ForkKind) -> Result<Fork, Error> {
        let file = self.file(index)?;
        let extent = match kind {
            ForkKind::Data => file.data_fork,
            ForkKind::Resource => file.resource_fork,
        };
        tracing::debug!("opening {:?} fork of {:?}", kind, file.name);

        ForkReader::new(&mut self.source, &self.geometry, &self.map)
            .open(extent.start_block, extent.logical_length)
    }

    pub fn open_data_fork(&mut self, index: usize) -> Result<Fork, Error> {
        self.open_fork(index, ForkKind::Data)
    }

    pub fn open_resource_fork(&mut self, index: usize) -> Result<Fork, Error> {
        self.open_fork(index, ForkKind::Resource)
    }
}

impl<R> Volume<R> {
    /// The volume name.
    pub fn name(&self) -> &str {
        &self.geometry.volume_name
    }

    pub fn info(&self) -> &Geometry {
        &self.geometry
    }

    pub fn allocation_map(&self) -> &AllocationMap {
        &self.map
    }

    /// Every file, in directory order.
    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Result<&FileDescriptor, Error> {
        self.files.get(index).ok_or(Error::NoSuchFile {
            index,
            count: self.files.len(),
        })
    }

    /// The index of the first file named exactly `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|file| file.name == name)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}
