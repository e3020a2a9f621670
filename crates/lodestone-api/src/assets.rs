//! Static reference tables: biome numeric ids and legacy block id mappings.
//!
//! `biomes.json` has the shape `{"biomes": {"<num>": {"id": "<name>"}}}`;
//! `items.json` maps `plugin -> name -> item info`, where an item's optional
//! `blockID` ties it to a legacy numeric block id.

use lodestone_chunk::ReferenceTables;
use lodestone_common::{LodestoneError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct BiomeFile {
    biomes: HashMap<String, BiomeDef>,
}

#[derive(Debug, Deserialize)]
struct BiomeDef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ItemDef {
    #[serde(rename = "blockID")]
    block_id: Option<i64>,
    #[serde(flatten)]
    _rest: serde_json::Map<String, Value>,
}

/// Immutable lookup tables, loaded once and shared by every request.
#[derive(Debug, Default)]
pub struct AssetTables {
    biomes: HashMap<i64, String>,
    block_ids: HashMap<i64, String>,
}

impl AssetTables {
    /// Loads `biomes.json` and `items.json` from the asset directory.
    pub fn load(assets_dir: &Path) -> Result<Self> {
        let biome_file: BiomeFile = read_json(&assets_dir.join("biomes.json"))?;
        let mut biomes = HashMap::new();
        for (key, def) in biome_file.biomes {
            let numeric = key.parse::<i64>().map_err(|_| {
                LodestoneError::FormatError(format!("non-numeric biome key {:?}", key))
            })?;
            biomes.insert(numeric, def.id);
        }

        let items: HashMap<String, HashMap<String, ItemDef>> =
            read_json(&assets_dir.join("items.json"))?;
        let mut block_ids = HashMap::new();
        for (plugin, plugin_items) in &items {
            for (name, item) in plugin_items {
                if let Some(block_id) = item.block_id {
                    block_ids
                        .entry(block_id)
                        .or_insert_with(|| format!("{}:{}", plugin, name));
                }
            }
        }

        Ok(AssetTables { biomes, block_ids })
    }

    /// Empty tables; every lookup misses. For tests and tools that do not
    /// need display names.
    pub fn empty() -> Self {
        AssetTables::default()
    }
}

impl ReferenceTables for AssetTables {
    fn biome_name(&self, numeric_id: i64) -> Option<String> {
        self.biomes.get(&numeric_id).cloned()
    }

    fn block_id_name(&self, block_id: i64) -> Option<String> {
        self.block_ids.get(&block_id).cloned()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            LodestoneError::NotFound(format!("missing asset {}", path.display()))
        } else {
            LodestoneError::IoError(err)
        }
    })?;
    serde_json::from_slice(&raw)
        .map_err(|err| LodestoneError::FormatError(format!("{}: {}", path.display(), err)))
}
