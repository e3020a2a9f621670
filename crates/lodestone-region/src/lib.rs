//! Anvil region container reader.
//!
//! A region file holds up to 32x32 chunk columns. The 8 KiB header is two
//! 4 KiB tables: 1024 location entries (3-byte big-endian sector offset plus
//! a 1-byte sector count), then 1024 big-endian modification timestamps. Each
//! stored column is a 4-byte big-endian length, a compression scheme byte
//! (1 = gzip, 2 = zlib) and the compressed NBT payload.

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::{GzDecoder, ZlibDecoder};
use lodestone_common::{types, LodestoneError, Result};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use lodestone_common::Dimension;

pub const SECTOR_SIZE: u64 = 4096;
pub const HEADER_SIZE: u64 = 2 * SECTOR_SIZE;

pub const COMPRESSION_GZIP: u8 = 1;
pub const COMPRESSION_ZLIB: u8 = 2;

/// One entry of the region header: where a chunk column is stored and when
/// it was last written. An offset of zero means the column is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLocation {
    pub offset_sectors: u32,
    pub sector_count: u8,
    pub timestamp: u32,
}

impl ChunkLocation {
    pub fn is_present(&self) -> bool {
        self.offset_sectors != 0
    }

    pub fn byte_offset(&self) -> u64 {
        self.offset_sectors as u64 * SECTOR_SIZE
    }
}

/// A region file opened for reading. The handle lives for one request; no
/// caching happens between calls.
#[derive(Debug)]
pub struct RegionFile<R> {
    reader: R,
    stream_len: u64,
    locations: Vec<ChunkLocation>,
}

impl RegionFile<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                LodestoneError::NotFound(format!("no region file at {}", path.display()))
            } else {
                LodestoneError::IoError(err)
            }
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> RegionFile<R> {
    pub fn from_reader(mut reader: R) -> Result<Self> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        if stream_len < HEADER_SIZE {
            return Err(LodestoneError::FormatError(format!(
                "region file too short for header: {} bytes",
                stream_len
            )));
        }
        reader.seek(SeekFrom::Start(0))?;

        let mut locations = Vec::with_capacity(1024);
        for _ in 0..1024 {
            let mut entry = [0u8; 4];
            reader.read_exact(&mut entry)?;
            locations.push(ChunkLocation {
                offset_sectors: u32::from_be_bytes([0, entry[0], entry[1], entry[2]]),
                sector_count: entry[3],
                timestamp: 0,
            });
        }
        for location in &mut locations {
            location.timestamp = reader.read_u32::<BigEndian>()?;
        }

        Ok(RegionFile {
            reader,
            stream_len,
            locations,
        })
    }

    /// Location table entry for a chunk coordinate (any coordinate that maps
    /// into this region's 32x32 grid).
    pub fn location(&self, chunk_x: i32, chunk_z: i32) -> &ChunkLocation {
        &self.locations[types::location_index(chunk_x, chunk_z)]
    }

    /// Decompressed NBT payload for one chunk column, or `None` when the
    /// location table marks the column absent. An absent column performs no
    /// seek or read.
    pub fn chunk_payload(&mut self, chunk_x: i32, chunk_z: i32) -> Result<Option<Vec<u8>>> {
        let location = *self.location(chunk_x, chunk_z);
        if !location.is_present() {
            debug!("chunk ({}, {}) absent from region", chunk_x, chunk_z);
            return Ok(None);
        }
        if location.byte_offset() + 5 > self.stream_len {
            return Err(LodestoneError::FormatError(format!(
                "chunk ({}, {}) offset {} points outside the region file",
                chunk_x,
                chunk_z,
                location.byte_offset()
            )));
        }

        self.reader.seek(SeekFrom::Start(location.byte_offset()))?;
        let length = self.reader.read_u32::<BigEndian>()? as usize;
        if length == 0 {
            return Err(LodestoneError::FormatError(format!(
                "chunk ({}, {}) has zero stored length",
                chunk_x, chunk_z
            )));
        }
        // The length prefix is untrusted; reject it before allocating.
        if location.byte_offset() + 4 + length as u64 > self.stream_len {
            return Err(LodestoneError::FormatError(format!(
                "chunk ({}, {}) stored length {} runs past the end of the region file",
                chunk_x, chunk_z, length
            )));
        }
        let scheme = self.reader.read_u8()?;
        let mut compressed = vec![0u8; length - 1];
        self.reader.read_exact(&mut compressed)?;

        let mut payload = Vec::new();
        match scheme {
            COMPRESSION_GZIP => {
                GzDecoder::new(&compressed[..]).read_to_end(&mut payload)?;
            }
            COMPRESSION_ZLIB => {
                ZlibDecoder::new(&compressed[..]).read_to_end(&mut payload)?;
            }
            other => {
                return Err(LodestoneError::FormatError(format!(
                    "chunk ({}, {}) has unknown compression scheme {}",
                    chunk_x, chunk_z, other
                )));
            }
        }
        Ok(Some(payload))
    }
}

/// Name of the region file containing a chunk coordinate.
pub fn region_file_name(chunk_x: i32, chunk_z: i32) -> String {
    format!(
        "r.{}.{}.mca",
        types::region_coord(chunk_x),
        types::region_coord(chunk_z)
    )
}

/// Full path of the region file for a chunk in a given world and dimension.
pub fn region_path(world_dir: &Path, dimension: Dimension, chunk_x: i32, chunk_z: i32) -> PathBuf {
    world_dir
        .join(dimension.region_subdir())
        .join(region_file_name(chunk_x, chunk_z))
}
