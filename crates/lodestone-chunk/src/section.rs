use crate::block::{BlockId, BlockInfo};
use crate::column::ChunkColumn;
use crate::merge;
use crate::tables::ReferenceTables;
use lodestone_common::{LodestoneError, Result};
use lodestone_nbt::Tag;
use log::debug;

/// `layers[layer][row][block]`, 16 entries each.
pub type SectionLayers = Vec<Vec<Vec<BlockInfo>>>;

/// First version (20w17a) whose packed indices no longer straddle 64-bit
/// word boundaries.
pub const PACKED_SCHEME_DATA_VERSION: i32 = 2529;

/// Newest format version this decoder understands. Anything above fails
/// loudly instead of guessing which packing scheme applies.
pub const MAX_KNOWN_DATA_VERSION: i32 = 4189;

/// How palette indices are packed into the 64-bit words of a block-state
/// array. Chosen once per column from `DataVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScheme {
    /// DataVersion >= 2529: each word holds `64 / bits` whole indices;
    /// leftover high bits are padding.
    Packed { bits: u32, per_long: u32 },
    /// DataVersion < 2529: indices are laid out back to back and may
    /// straddle a word boundary.
    Straddling { bits: u32 },
}

impl IndexScheme {
    pub fn for_version(data_version: i32, palette_len: usize) -> Result<Self> {
        if palette_len == 0 {
            return Err(LodestoneError::FormatError(
                "section palette is empty".to_owned(),
            ));
        }
        let bits = bits_for_palette(palette_len);
        if data_version >= PACKED_SCHEME_DATA_VERSION {
            Ok(IndexScheme::Packed {
                bits,
                per_long: 64 / bits,
            })
        } else {
            Ok(IndexScheme::Straddling { bits })
        }
    }

    /// Palette index for one of the 4096 block positions.
    pub fn index_at(&self, words: &[i64], block_index: usize) -> Result<usize> {
        match *self {
            IndexScheme::Packed { bits, per_long } => {
                let mask = (1u64 << bits) - 1;
                let word = words.get(block_index / per_long as usize).ok_or_else(|| {
                    LodestoneError::FormatError(format!(
                        "block state array too short for index {}",
                        block_index
                    ))
                })?;
                let shift = (block_index as u32 % per_long) * bits;
                Ok(((*word as u64 >> shift) & mask) as usize)
            }
            IndexScheme::Straddling { bits } => {
                let mask = (1u64 << bits) - 1;
                let bit_offset = block_index * bits as usize;
                let first = bit_offset / 64;
                let offset = (bit_offset % 64) as u32;
                // Words past the end of the array read as zero.
                let lo = words.get(first).copied().unwrap_or(0) as u64;
                let mut value = lo >> offset;
                if offset + bits > 64 {
                    let hi = words.get(first + 1).copied().unwrap_or(0) as u64;
                    value |= hi << (64 - offset);
                }
                Ok((value & mask) as usize)
            }
        }
    }
}

/// Bits needed per palette index, with the format's floor of 4.
pub fn bits_for_palette(palette_len: usize) -> u32 {
    let needed = usize::BITS - palette_len.saturating_sub(1).leading_zeros();
    needed.max(4)
}

/// 4-bit value at `index` in a packed nibble array: low nibble for even
/// indices, high nibble for odd ones.
pub fn nibble(data: &[i8], index: usize) -> Option<u8> {
    let byte = *data.get(index / 2)? as u8;
    Some(if index % 2 == 0 {
        byte & 15
    } else {
        byte >> 4
    })
}

enum BlockSource<'a> {
    Paletted {
        palette: &'a [Tag],
        words: &'a [i64],
        scheme: IndexScheme,
    },
    Flat {
        blocks: &'a [i8],
        add: Option<&'a [i8]>,
    },
    Air,
}

/// Decodes one 16x16x16 section of a chunk column into the API layer grid,
/// including biome resolution and entity / block-entity merging. A missing
/// section is valid and produces all-air records (coordinates and biome
/// only).
pub fn decode_section_blocks(
    column: &ChunkColumn,
    chunk_x: i32,
    section_y: i32,
    chunk_z: i32,
    tables: &dyn ReferenceTables,
) -> Result<SectionLayers> {
    let data_version = column.data_version();
    if data_version > MAX_KNOWN_DATA_VERSION {
        return Err(LodestoneError::FormatError(format!(
            "unrecognized DataVersion {} (newest known: {})",
            data_version, MAX_KNOWN_DATA_VERSION
        )));
    }

    let section = column.find_section(section_y);
    if section.is_none() {
        debug!(
            "section {} of chunk ({}, {}) absent, treating as air",
            section_y, chunk_x, chunk_z
        );
    }

    let source = match section {
        Some(section) => block_source(section, data_version)?,
        None => BlockSource::Air,
    };
    let damage = section.and_then(|s| s.get("Data")).and_then(Tag::as_byte_array);
    let block_light = section
        .and_then(|s| s.get("BlockLight"))
        .and_then(Tag::as_byte_array);
    let sky_light = section
        .and_then(|s| s.get("SkyLight"))
        .and_then(Tag::as_byte_array);
    let biomes = column.biomes();

    let mut layers = Vec::with_capacity(16);
    for layer in 0..16i32 {
        let block_y = section_y * 16 + layer;
        let mut rows = Vec::with_capacity(16);
        for row in 0..16i32 {
            let block_z = chunk_z * 16 + row;
            let mut blocks = Vec::with_capacity(16);
            for col in 0..16i32 {
                let block_x = chunk_x * 16 + col;
                let mut info = BlockInfo::at(block_x, block_y, block_z);

                if let Some(biomes) = &biomes {
                    if let Some(numeric) = biome_at(biomes, block_y, row, col) {
                        info.biome = tables.biome_name(numeric);
                    }
                }

                let block_index = (256 * layer + 16 * row + col) as usize;
                match &source {
                    BlockSource::Paletted {
                        palette,
                        words,
                        scheme,
                    } => {
                        let index = scheme.index_at(words, block_index)?;
                        info.id = Some(palette_entry_id(palette, index)?);
                    }
                    BlockSource::Flat { blocks, add } => {
                        let mut id = blocks[block_index] as u8 as i64;
                        if let Some(add) = add {
                            if let Some(high) = nibble(add, block_index) {
                                id += (high as i64) << 8;
                            }
                        }
                        info.id = Some(match tables.block_id_name(id) {
                            Some(name) => BlockId::Namespaced(name),
                            None => BlockId::Numeric(id),
                        });
                    }
                    BlockSource::Air => {}
                }

                if let Some(damage) = damage {
                    info.damage = nibble(damage, block_index);
                }
                if let Some(block_light) = block_light {
                    info.block_light = nibble(block_light, block_index);
                }
                if let Some(sky_light) = sky_light {
                    info.sky_light = nibble(sky_light, block_index);
                }
                blocks.push(info);
            }
            rows.push(blocks);
        }
        layers.push(rows);
    }

    merge::attach_entities(&mut layers, column.entities(), section_y);
    merge::attach_tile_entities(&mut layers, column.tile_entities(), section_y);
    Ok(layers)
}

fn block_source<'a>(section: &'a Tag, data_version: i32) -> Result<BlockSource<'a>> {
    let palette = section.get("Palette").and_then(Tag::as_list);
    let words = section.get("BlockStates").and_then(Tag::as_long_array);
    if let (Some(palette), Some(words)) = (palette, words) {
        let scheme = IndexScheme::for_version(data_version, palette.len())?;
        return Ok(BlockSource::Paletted {
            palette,
            words,
            scheme,
        });
    }
    if let Some(blocks) = section.get("Blocks").and_then(Tag::as_byte_array) {
        if blocks.len() < 4096 {
            return Err(LodestoneError::FormatError(format!(
                "legacy block array has {} entries, expected 4096",
                blocks.len()
            )));
        }
        return Ok(BlockSource::Flat {
            blocks,
            add: section.get("Add").and_then(Tag::as_byte_array),
        });
    }
    // A section tag with neither representation carries no block data
    // (light-only sections at column borders).
    Ok(BlockSource::Air)
}

fn palette_entry_id(palette: &[Tag], index: usize) -> Result<BlockId> {
    let entry = palette.get(index).ok_or_else(|| {
        LodestoneError::FormatError(format!(
            "palette index {} out of range ({} entries)",
            index,
            palette.len()
        ))
    })?;
    match entry {
        Tag::String(name) => Ok(BlockId::Namespaced(name.clone())),
        Tag::Compound(_) => match entry.get("Name").and_then(Tag::as_str) {
            Some(name) => Ok(BlockId::Namespaced(name.to_owned())),
            None => Err(LodestoneError::FormatError(
                "palette entry has no Name".to_owned(),
            )),
        },
        _ => Err(LodestoneError::FormatError(
            "palette entry is neither string nor compound".to_owned(),
        )),
    }
}

/// Numeric biome value for a block, by array length: 1024 entries address
/// 4x4x4 cubes over the whole column, 256 entries address the column by
/// footprint. Any other length (or an out-of-range index) yields nothing.
fn biome_at(biomes: &[i64], block_y: i32, row: i32, col: i32) -> Option<i64> {
    let index = match biomes.len() {
        1024 => 16 * block_y.div_euclid(4) + 4 * (row / 4) + col / 4,
        256 => 16 * row + col,
        _ => return None,
    };
    if index < 0 {
        return None;
    }
    biomes.get(index as usize).copied()
}
