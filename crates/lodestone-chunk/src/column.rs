use lodestone_common::Result;
use lodestone_nbt::{NbtFile, Tag};
use std::io::Cursor;

/// Decoded NBT for one chunk column.
///
/// Columns written before 21w43a wrap their data in a `Level` compound;
/// later ones keep it at the root. Accessors look in `Level` first and fall
/// back to the root.
pub struct ChunkColumn {
    root: Tag,
}

impl ChunkColumn {
    pub fn from_tag(root: Tag) -> Self {
        ChunkColumn { root }
    }

    /// Decodes a column from the raw payload extracted from a region file.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let file = NbtFile::read(&mut Cursor::new(payload))?;
        Ok(ChunkColumn { root: file.root })
    }

    pub fn data_version(&self) -> i32 {
        self.root
            .get("DataVersion")
            .and_then(Tag::as_int)
            .unwrap_or(0) as i32
    }

    fn level(&self) -> &Tag {
        self.root.get("Level").unwrap_or(&self.root)
    }

    pub fn sections(&self) -> &[Tag] {
        self.level()
            .get("Sections")
            .or_else(|| self.level().get("sections"))
            .and_then(Tag::as_list)
            .unwrap_or(&[])
    }

    /// Section at a signed Y index, or `None` (all air).
    pub fn find_section(&self, section_y: i32) -> Option<&Tag> {
        self.sections().iter().find(|section| {
            section.get("Y").and_then(Tag::as_int) == Some(section_y as i64)
        })
    }

    /// Column biome values as widened integers. 1024 entries address 4x4x4
    /// cubes, 256 entries address columns; any other length is unusable.
    pub fn biomes(&self) -> Option<Vec<i64>> {
        match self.level().get("Biomes")? {
            Tag::ByteArray(values) => Some(values.iter().map(|&v| v as u8 as i64).collect()),
            Tag::IntArray(values) => Some(values.iter().map(|&v| v as i64).collect()),
            _ => None,
        }
    }

    pub fn entities(&self) -> &[Tag] {
        self.level()
            .get("Entities")
            .and_then(Tag::as_list)
            .unwrap_or(&[])
    }

    pub fn tile_entities(&self) -> &[Tag] {
        self.level()
            .get("TileEntities")
            .or_else(|| self.level().get("block_entities"))
            .and_then(Tag::as_list)
            .unwrap_or(&[])
    }
}
