//! Associates loose entity and block-entity records with the block they
//! occupy inside a decoded section.

use crate::section::SectionLayers;
use lodestone_nbt::{to_json, Tag};

/// Attaches every entity whose position falls inside the section's Y range
/// to the block at its truncated coordinate. Entities accumulate into the
/// `entities` list from the first occurrence.
pub fn attach_entities(layers: &mut SectionLayers, entities: &[Tag], section_y: i32) {
    let y_min = (section_y * 16) as f64;
    for entity in entities {
        let Some(pos) = entity.get("Pos").and_then(Tag::as_list) else {
            continue;
        };
        let (Some(x), Some(y), Some(z)) = (
            pos.first().and_then(Tag::as_f64),
            pos.get(1).and_then(Tag::as_f64),
            pos.get(2).and_then(Tag::as_f64),
        ) else {
            continue;
        };
        if y < y_min || y >= y_min + 16.0 {
            continue;
        }
        // Truncation toward zero matches the original coordinate handling.
        let info = &mut layers[(y as i32 & 15) as usize][(z as i32 & 15) as usize]
            [(x as i32 & 15) as usize];
        info.entities.get_or_insert_with(Vec::new).push(to_json(entity));
    }
}

/// Attaches block entities by their integer coordinates, stripping the
/// coordinate tags from the attached record. The first block entity on a
/// coordinate is stored under the singular `tileEntity` key; a second
/// promotes both into the plural `tileEntities` list and removes the
/// singular key. This merge-then-promote behavior is load-bearing for API
/// compatibility.
pub fn attach_tile_entities(layers: &mut SectionLayers, tile_entities: &[Tag], section_y: i32) {
    for tile_entity in tile_entities {
        let (Some(x), Some(y), Some(z)) = (
            tile_entity.get("x").and_then(Tag::as_int),
            tile_entity.get("y").and_then(Tag::as_int),
            tile_entity.get("z").and_then(Tag::as_int),
        ) else {
            continue;
        };
        if y < (section_y as i64) * 16 || y >= (section_y as i64) * 16 + 16 {
            continue;
        }
        let value = to_json(&without_coordinates(tile_entity));
        let info = &mut layers[(y & 15) as usize][(z & 15) as usize][(x & 15) as usize];
        if let Some(list) = &mut info.tile_entities {
            list.push(value);
        } else if let Some(first) = info.tile_entity.take() {
            info.tile_entities = Some(vec![first, value]);
        } else {
            info.tile_entity = Some(value);
        }
    }
}

fn without_coordinates(tile_entity: &Tag) -> Tag {
    match tile_entity.as_compound() {
        Some(children) => {
            let mut stripped = children.clone();
            stripped.remove("x");
            stripped.remove("y");
            stripped.remove("z");
            Tag::Compound(stripped)
        }
        None => tile_entity.clone(),
    }
}
