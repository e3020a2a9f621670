//! Endpoint handlers. Each one reads world data fresh from disk for the
//! request; nothing is cached between calls.

use crate::routes::{Extension, Params, Response};
use crate::stats::reshape_stats;
use crate::ApiContext;
use lodestone_chunk::{decode_section_blocks, ChunkColumn};
use lodestone_common::{Dimension, LodestoneError, Result};
use lodestone_nbt::{to_json, NbtFile};
use lodestone_region::{region_path, RegionFile};
use log::info;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn world_dir(context: &ApiContext, params: &Params) -> Result<PathBuf> {
    let world = params.str("world")?;
    context
        .directory
        .world_dir(world)
        .ok_or_else(|| LodestoneError::NotFound(format!("no world named {}", world)))
}

fn dimension(params: &Params) -> Result<Dimension> {
    let part = params.str("dimension")?;
    Dimension::from_url_part(part)
        .ok_or_else(|| LodestoneError::NotFound(format!("no dimension named {}", part)))
}

/// One decoded 16x16x16 section as a y/z/x grid of block records.
pub fn chunk_blocks(context: &ApiContext, params: &Params) -> Result<Response> {
    let world_dir = world_dir(context, params)?;
    let dimension = dimension(params)?;
    let x = params.int("x")?;
    let y = params.int("y")?;
    let z = params.int("z")?;

    let path = region_path(&world_dir, dimension, x, z);
    let mut region = RegionFile::open(&path)?;
    let payload = region.chunk_payload(x, z)?.ok_or_else(|| {
        LodestoneError::NotFound(format!("chunk column ({}, {}) not generated", x, z))
    })?;
    let column = ChunkColumn::from_payload(&payload)?;
    let layers = decode_section_blocks(&column, x, y, z, &context.tables)?;

    info!("decoded chunk ({}, {}, {}) from {}", x, y, z, path.display());
    let value = serde_json::to_value(layers)
        .map_err(|err| LodestoneError::FormatError(err.to_string()))?;
    Ok(Response::Json(value))
}

/// The raw region file, byte for byte.
pub fn region_raw(context: &ApiContext, params: &Params) -> Result<Response> {
    let world_dir = world_dir(context, params)?;
    let dimension = dimension(params)?;
    let rx = params.int("rx")?;
    let rz = params.int("rz")?;

    let path = world_dir
        .join(dimension.region_subdir())
        .join(format!("r.{}.{}.mca", rx, rz));
    let body = std::fs::read(&path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            LodestoneError::NotFound(format!("no region file at {}", path.display()))
        } else {
            LodestoneError::IoError(err)
        }
    })?;
    Ok(Response::Binary {
        content_type: "application/octet-stream",
        body,
    })
}

pub fn level_data(context: &ApiContext, params: &Params) -> Result<Response> {
    let world_dir = world_dir(context, params)?;
    nbt_single_file(&world_dir.join("level.dat"), params.extension)
}

pub fn player_data(context: &ApiContext, params: &Params) -> Result<Response> {
    let world_dir = world_dir(context, params)?;
    let uuid = player_uuid(context, params)?;
    nbt_single_file(
        &world_dir.join("playerdata").join(format!("{}.dat", uuid)),
        params.extension,
    )
}

/// Player statistics, reshaped from the game's flat dotted keys into a
/// nested category tree.
pub fn player_stats(context: &ApiContext, params: &Params) -> Result<Response> {
    let world_dir = world_dir(context, params)?;
    let uuid = player_uuid(context, params)?;
    let path = world_dir.join("stats").join(format!("{}.json", uuid));
    let raw = std::fs::read(&path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            LodestoneError::NotFound(format!("no stats for player {}", uuid))
        } else {
            LodestoneError::IoError(err)
        }
    })?;
    let flat: Value = serde_json::from_slice(&raw)
        .map_err(|err| LodestoneError::FormatError(format!("{}: {}", path.display(), err)))?;
    let flat = flat.as_object().ok_or_else(|| {
        LodestoneError::FormatError(format!("{}: stats root is not an object", path.display()))
    })?;
    Ok(Response::Json(with_api_time(reshape_stats(flat), &path)?))
}

fn player_uuid(context: &ApiContext, params: &Params) -> Result<uuid::Uuid> {
    let player = params.str("player")?;
    context
        .directory
        .player_uuid(player)
        .ok_or_else(|| LodestoneError::NotFound(format!("no player named {}", player)))
}

/// Serves a gzipped NBT file either projected as JSON (with fetch metadata)
/// or re-encoded as the raw gzip stream.
fn nbt_single_file(path: &Path, extension: Extension) -> Result<Response> {
    let raw = std::fs::read(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            LodestoneError::NotFound(format!("no data file at {}", path.display()))
        } else {
            LodestoneError::IoError(err)
        }
    })?;
    let file = NbtFile::read_sniffed(&raw)?;
    match extension {
        Extension::Json => {
            let value = to_json(&file.root);
            Ok(Response::Json(with_api_time(value, path)?))
        }
        _ => {
            let mut body = Vec::new();
            file.write_gzip(&mut body)?;
            Ok(Response::Binary {
                content_type: "application/x-minecraft-nbt",
                body,
            })
        }
    }
}

/// Adds the fetch metadata the JSON representations carry: when the backing
/// file last changed and when this response was produced, both as Unix
/// seconds. Fields already present in the decoded data are left untouched.
/// A non-object value is wrapped so the fields have somewhere to live.
fn with_api_time(value: Value, path: &Path) -> Result<Value> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert("data".to_owned(), other);
            wrapped
        }
    };
    let modified = std::fs::metadata(path)?.modified()?;
    object
        .entry("apiTimeLastModified".to_owned())
        .or_insert(json!(unix_seconds(modified)?));
    object
        .entry("apiTimeResultFetched".to_owned())
        .or_insert(json!(unix_seconds(SystemTime::now())?));
    Ok(Value::Object(object))
}

fn unix_seconds(time: SystemTime) -> Result<f64> {
    let elapsed = time
        .duration_since(UNIX_EPOCH)
        .map_err(|err| LodestoneError::FormatError(format!("timestamp before epoch: {}", err)))?;
    Ok(elapsed.as_secs_f64())
}
