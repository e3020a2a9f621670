//! Chunk column and section decoding.
//!
//! Turns a decoded chunk column tag tree into the API-facing 16x16x16 grid of
//! [`BlockInfo`] records: packed palette indices (two bit-packing schemes,
//! selected by `DataVersion`), legacy flat block arrays, nibble-packed
//! damage/light values, biome resolution, and the entity / block-entity
//! merger.

pub mod block;
pub mod column;
pub mod merge;
pub mod section;
pub mod tables;

pub use block::{BlockId, BlockInfo};
pub use column::ChunkColumn;
pub use section::{decode_section_blocks, SectionLayers};
pub use tables::ReferenceTables;
