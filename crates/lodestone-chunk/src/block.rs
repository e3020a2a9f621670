use serde::Serialize;
use serde_json::Value;

/// Block identifier: namespaced string for palette-era and remapped legacy
/// blocks, plain numeric id when the items table has no mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockId {
    Numeric(i64),
    Namespaced(String),
}

/// API-facing record for one absolute block position. Constructed fresh per
/// request from decoded section, biome and entity data; never persisted.
/// Optional fields are omitted from the JSON output when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BlockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_light: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky_light: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_entity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tile_entities: Option<Vec<Value>>,
}

impl BlockInfo {
    pub fn at(x: i32, y: i32, z: i32) -> Self {
        BlockInfo {
            x,
            y,
            z,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_block_serializes_coordinates_only() {
        let info = BlockInfo::at(1, 64, -3);
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"x": 1, "y": 64, "z": -3})
        );
    }

    #[test]
    fn test_optional_fields_use_camel_case() {
        let mut info = BlockInfo::at(0, 0, 0);
        info.id = Some(BlockId::Namespaced("minecraft:stone".to_owned()));
        info.block_light = Some(3);
        info.sky_light = Some(15);
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({
                "x": 0, "y": 0, "z": 0,
                "id": "minecraft:stone",
                "blockLight": 3,
                "skyLight": 15,
            })
        );
    }

    #[test]
    fn test_numeric_id_serializes_as_number() {
        let mut info = BlockInfo::at(0, 0, 0);
        info.id = Some(BlockId::Numeric(276));
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            json!({"x": 0, "y": 0, "z": 0, "id": 276})
        );
    }
}
