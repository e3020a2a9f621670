//! End-to-end exercises of the dispatch pipeline against a synthetic world
//! written to a temporary directory: region file, level data, player data
//! and statistics.

use assert_matches::assert_matches;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lodestone_api::{ApiContext, ApiTree, AssetTables, Response, StaticDirectory};
use lodestone_common::LodestoneError;
use lodestone_nbt::{NbtFile, Tag};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

const PLAYER_UUID: &str = "be9ec550-5da2-46eb-ab11-cfcf088e2c9c";

fn compound(entries: Vec<(&str, Tag)>) -> Tag {
    Tag::Compound(
        entries
            .into_iter()
            .map(|(name, tag)| (name.to_owned(), tag))
            .collect(),
    )
}

/// Chunk column (0, 0) with one stored section at Y=4: stone at local
/// (x=1, z=0, y=64), everything else air, plains biome throughout, two
/// block entities on the stone and one entity standing on it.
fn chunk_root() -> Tag {
    let palette = Tag::List(vec![
        compound(vec![("Name", Tag::String("minecraft:air".to_owned()))]),
        compound(vec![("Name", Tag::String("minecraft:stone".to_owned()))]),
    ]);
    // 4 bits per index, 16 indices per long; only block index 1 is non-air.
    let mut block_states = vec![0i64; 256];
    block_states[0] = 1 << 4;

    let section = compound(vec![
        ("Y", Tag::Byte(4)),
        ("Palette", palette),
        ("BlockStates", Tag::LongArray(block_states)),
    ]);

    let tile_entity = |id: &str| {
        compound(vec![
            ("id", Tag::String(id.to_owned())),
            ("x", Tag::Int(1)),
            ("y", Tag::Int(64)),
            ("z", Tag::Int(0)),
        ])
    };
    let entity = compound(vec![
        ("id", Tag::String("minecraft:armor_stand".to_owned())),
        (
            "Pos",
            Tag::List(vec![Tag::Double(1.5), Tag::Double(64.0), Tag::Double(0.5)]),
        ),
    ]);

    let level = compound(vec![
        ("xPos", Tag::Int(0)),
        ("zPos", Tag::Int(0)),
        ("Sections", Tag::List(vec![section])),
        ("Biomes", Tag::IntArray(vec![1; 256])),
        (
            "TileEntities",
            Tag::List(vec![tile_entity("minecraft:chest"), tile_entity("minecraft:sign")]),
        ),
        ("Entities", Tag::List(vec![entity])),
    ]);

    compound(vec![("DataVersion", Tag::Int(2566)), ("Level", level)])
}

fn region_bytes(chunk: &Tag) -> Vec<u8> {
    let nbt = NbtFile::new(String::new(), chunk.clone())
        .to_bytes()
        .unwrap();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&nbt).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut bytes = vec![0u8; 8192];
    // Location entry for chunk (0, 0): sector offset 2, one sector.
    bytes[0..4].copy_from_slice(&[0, 0, 2, 1]);
    bytes.extend_from_slice(&((compressed.len() as u32 + 1).to_be_bytes()));
    bytes.push(2);
    bytes.extend_from_slice(&compressed);
    while bytes.len() % 4096 != 0 {
        bytes.push(0);
    }
    bytes
}

fn gzip_nbt(root: Tag) -> Vec<u8> {
    let mut bytes = Vec::new();
    NbtFile::new(String::new(), root)
        .write_gzip(&mut bytes)
        .unwrap();
    bytes
}

/// Writes the whole synthetic world under a per-test temporary directory
/// and returns a ready context.
fn setup(label: &str) -> (ApiContext, PathBuf) {
    let base = std::env::temp_dir().join(format!(
        "lodestone-api-test-{}-{}",
        std::process::id(),
        label
    ));
    let _ = fs::remove_dir_all(&base);

    let assets = base.join("assets");
    fs::create_dir_all(&assets).unwrap();
    fs::write(
        assets.join("biomes.json"),
        r#"{"biomes": {"1": {"id": "plains"}}}"#,
    )
    .unwrap();
    fs::write(
        assets.join("items.json"),
        r#"{"minecraft": {"stone": {"blockID": 1}}}"#,
    )
    .unwrap();

    let world = base.join("worlds").join("wurstmineberg");
    fs::create_dir_all(world.join("region")).unwrap();
    fs::write(
        world.join("region").join("r.0.0.mca"),
        region_bytes(&chunk_root()),
    )
    .unwrap();

    fs::write(
        world.join("level.dat"),
        gzip_nbt(compound(vec![(
            "Data",
            compound(vec![("LevelName", Tag::String("wurstmineberg".to_owned()))]),
        )])),
    )
    .unwrap();

    fs::create_dir_all(world.join("playerdata")).unwrap();
    fs::write(
        world.join("playerdata").join(format!("{}.dat", PLAYER_UUID)),
        gzip_nbt(compound(vec![("playerGameType", Tag::Int(0))])),
    )
    .unwrap();

    fs::create_dir_all(world.join("stats")).unwrap();
    fs::write(
        world.join("stats").join(format!("{}.json", PLAYER_UUID)),
        r#"{"stat.jump": 3, "stat.mineBlock.minecraft.stone": 42}"#,
    )
    .unwrap();

    let mut players = HashMap::new();
    players.insert("fenhl".to_owned(), Uuid::parse_str(PLAYER_UUID).unwrap());
    let context = ApiContext {
        directory: Box::new(StaticDirectory::new(
            base.join("worlds"),
            vec!["fenhl".to_owned()],
            players,
        )),
        tables: AssetTables::load(&assets).unwrap(),
    };
    (context, base)
}

fn dispatch_json(context: &ApiContext, path: &str, identity: Option<&str>) -> Value {
    match ApiTree::new().dispatch(context, path, identity).unwrap() {
        Response::Json(value) => value,
        Response::Binary { .. } => panic!("expected JSON for {}", path),
    }
}

#[test]
fn test_chunk_section_json() {
    let (context, _base) = setup("chunk");
    let value = dispatch_json(
        &context,
        "world/wurstmineberg/dim/overworld/chunk/0/4/0.json",
        None,
    );

    let stone = &value[0][0][1];
    assert_eq!(stone["id"], "minecraft:stone");
    assert_eq!(stone["x"], 1);
    assert_eq!(stone["y"], 64);
    assert_eq!(stone["z"], 0);
    assert_eq!(stone["biome"], "plains");

    // Two block entities on the same block: promoted to the plural list.
    assert_eq!(stone["tileEntities"].as_array().unwrap().len(), 2);
    assert!(stone.get("tileEntity").is_none());
    assert_eq!(stone["tileEntities"][0]["id"], "minecraft:chest");
    // Coordinate tags are stripped from the projected block entity.
    assert!(stone["tileEntities"][0].get("x").is_none());

    assert_eq!(stone["entities"].as_array().unwrap().len(), 1);
    assert_eq!(stone["entities"][0]["id"], "minecraft:armor_stand");

    let air = &value[0][0][0];
    assert_eq!(air["id"], "minecraft:air");
    assert!(air.get("tileEntities").is_none());
}

#[test]
fn test_absent_chunk_is_not_found() {
    let (context, _base) = setup("absent");
    assert_matches!(
        ApiTree::new().dispatch(
            &context,
            "world/wurstmineberg/dim/overworld/chunk/3/4/7.json",
            None
        ),
        Err(LodestoneError::NotFound(_))
    );
}

#[test]
fn test_wrong_extension_on_chunk() {
    let (context, _base) = setup("ext");
    assert_matches!(
        ApiTree::new().dispatch(
            &context,
            "world/wurstmineberg/dim/overworld/chunk/0/4/0.mca",
            None
        ),
        Err(LodestoneError::WrongExtension { requested, expected })
            if requested == "mca" && expected == "json"
    );
}

#[test]
fn test_region_passthrough_is_byte_identical() {
    let (context, base) = setup("region");
    let on_disk = fs::read(
        base.join("worlds")
            .join("wurstmineberg")
            .join("region")
            .join("r.0.0.mca"),
    )
    .unwrap();
    let response = ApiTree::new()
        .dispatch(
            &context,
            "world/wurstmineberg/dim/overworld/region/0/0.mca",
            None,
        )
        .unwrap();
    assert_matches!(
        response,
        Response::Binary { content_type: "application/octet-stream", body }
            if body == on_disk
    );
}

#[test]
fn test_level_json_carries_fetch_metadata() {
    let (context, _base) = setup("level");
    let value = dispatch_json(&context, "world/wurstmineberg/level.json", None);
    assert_eq!(value["Data"]["LevelName"], "wurstmineberg");
    assert!(value["apiTimeLastModified"].is_number());
    assert!(value["apiTimeResultFetched"].is_number());
    assert!(
        value["apiTimeResultFetched"].as_f64().unwrap()
            >= value["apiTimeLastModified"].as_f64().unwrap()
    );
}

#[test]
fn test_existing_fetch_metadata_is_preserved() {
    // Data that already carries an apiTime field keeps its own value; only
    // the missing companion is filled in.
    let (context, base) = setup("apitime");
    fs::write(
        base.join("worlds").join("wurstmineberg").join("level.dat"),
        gzip_nbt(compound(vec![
            ("apiTimeLastModified", Tag::Double(123.0)),
            ("LevelName", Tag::String("wurstmineberg".to_owned())),
        ])),
    )
    .unwrap();
    let value = dispatch_json(&context, "world/wurstmineberg/level.json", None);
    assert_eq!(value["apiTimeLastModified"], 123.0);
    assert!(value["apiTimeResultFetched"].is_number());
}

#[test]
fn test_level_dat_is_gzip() {
    let (context, _base) = setup("leveldat");
    let response = ApiTree::new()
        .dispatch(&context, "world/wurstmineberg/level.dat", None)
        .unwrap();
    assert_matches!(
        response,
        Response::Binary { content_type: "application/x-minecraft-nbt", body }
            if body[..2] == [0x1f, 0x8b]
    );
}

#[test]
fn test_player_data_requires_membership() {
    let (context, _base) = setup("auth");
    let tree = ApiTree::new();
    let path = "world/wurstmineberg/player/fenhl/playerdata.json";
    assert_matches!(
        tree.dispatch(&context, path, None),
        Err(LodestoneError::Unauthorized)
    );
    assert_matches!(
        tree.dispatch(&context, path, Some("stranger")),
        Err(LodestoneError::Unauthorized)
    );
    let value = dispatch_json(&context, path, Some("fenhl"));
    assert_eq!(value["playerGameType"], 0);
}

#[test]
fn test_player_lookup_by_raw_uuid() {
    let (context, _base) = setup("uuid");
    let value = dispatch_json(
        &context,
        &format!("world/wurstmineberg/player/{}/playerdata.json", PLAYER_UUID),
        Some("fenhl"),
    );
    assert_eq!(value["playerGameType"], 0);
}

#[test]
fn test_stats_are_reshaped() {
    let (context, _base) = setup("stats");
    let value = dispatch_json(
        &context,
        "world/wurstmineberg/player/fenhl/stats.json",
        Some("fenhl"),
    );
    assert_eq!(value["stat"]["jump"], 3);
    assert_eq!(value["stat"]["mineBlock"]["minecraft"]["stone"], 42);
    assert!(value["apiTimeLastModified"].is_number());
}

#[test]
fn test_unknown_world_is_not_found() {
    let (context, _base) = setup("noworld");
    assert_matches!(
        ApiTree::new().dispatch(&context, "world/atlantis/level.json", None),
        Err(LodestoneError::NotFound(_))
    );
}
