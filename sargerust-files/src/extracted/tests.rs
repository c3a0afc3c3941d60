use serde_json::json;

use crate::ParserError;
use crate::decoder::{ADTFiles, AssetDecoder};
use crate::extracted::{JsonDecoder, MCVT_HEIGHT_COUNT};

fn bytes(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).expect("serializable")
}

fn root_file(heights: usize) -> Vec<u8> {
    bytes(json!({
        "mcnks": [{
            "indexX": 0,
            "indexY": 0,
            "position": { "x": 0.0, "y": 0.0, "z": 10.0 },
            "heights": vec![1.5f32; heights],
        }]
    }))
}

#[test]
fn adt_companion_files_are_merged() -> Result<(), anyhow::Error> {
    let root = root_file(MCVT_HEIGHT_COUNT);
    let obj0 = bytes(json!({
        "modelFileIds": [100],
        "doodadDefs": [{
            "nameId": 0,
            "uniqueId": 7,
            "position": { "x": 1.0, "y": 2.0, "z": 3.0 },
            "rotation": { "x": 0.0, "y": 90.0, "z": 0.0 },
            "scale": 1024
        }]
    }));
    let tex0 = bytes(json!({
        "textureFileIds": [500, 501],
        "chunkLayers": [[{ "textureId": 0 }, { "textureId": 1, "alphaMap": vec![255u8; 4096] }]]
    }));

    let asset = JsonDecoder::default().decode_adt(&ADTFiles {
        root: &root,
        obj0: &obj0,
        obj1: None,
        tex0: &tex0,
    })?;

    assert_eq!(asset.mcnks.len(), 1);
    assert_eq!(asset.mcnks[0].layers.len(), 2);
    assert!(asset.mcnks[0].layers[1].alphaMap.is_some());
    assert_eq!(asset.textureFileIds, vec![500, 501]);
    assert_eq!(asset.objects[0].doodadDefs[0].uniqueId, 7);
    assert!(asset.objects[1].doodadDefs.is_empty());
    Ok(())
}

#[test]
fn adt_with_truncated_heights_is_rejected() {
    let root = root_file(81);
    let obj0 = bytes(json!({}));
    let tex0 = bytes(json!({ "textureFileIds": [], "chunkLayers": [[]] }));

    let result = JsonDecoder::default().decode_adt(&ADTFiles {
        root: &root,
        obj0: &obj0,
        obj1: None,
        tex0: &tex0,
    });

    assert!(matches!(result, Err(ParserError::InvalidRecord { asset: "MCNK", .. })));
}

#[test]
fn empty_buffers_are_an_error() {
    assert!(matches!(
        JsonDecoder::default().decode_m2(&[]),
        Err(ParserError::EmptySource)
    ));
}

#[test]
fn wdt_tiles_outside_of_the_map_are_rejected() {
    let wdt = bytes(json!({
        "mphd": 0,
        "tiles": [{ "x": 64, "y": 3, "rootADT": 1, "obj0ADT": 2, "tex0ADT": 3 }]
    }));

    assert!(JsonDecoder::default().decode_wdt(&wdt).is_err());
}

#[test]
fn wdt_tile_lookup_skips_missing_roots() -> Result<(), anyhow::Error> {
    let wdt = bytes(json!({
        "mphd": 0,
        "tiles": [
            { "x": 1, "y": 2, "rootADT": 10, "obj0ADT": 11, "tex0ADT": 12 },
            { "x": 2, "y": 2, "rootADT": 0, "obj0ADT": 0, "tex0ADT": 0 }
        ]
    }));

    let wdt = JsonDecoder::default().decode_wdt(&wdt)?;
    assert!(wdt.has_chunk(1, 2));
    assert!(!wdt.has_chunk(2, 2));
    assert_eq!(wdt.tile(1, 2).map(|tile| tile.obj0ADT), Some(11));
    Ok(())
}

#[test]
fn blp_level0_needs_to_cover_the_image() {
    let blp = bytes(json!({
        "width": 8,
        "height": 8,
        "format": "Dxt1",
        "mips": [vec![0u8; 16]]
    }));

    assert!(JsonDecoder::default().decode_blp(&blp).is_err());

    let blp = bytes(json!({
        "width": 8,
        "height": 8,
        "format": "Dxt1",
        "mips": [vec![0u8; 32], vec![0u8; 8]]
    }));

    assert!(JsonDecoder::default().decode_blp(&blp).is_ok());
}

#[test]
fn doodad_sets_always_include_the_default_set() -> Result<(), anyhow::Error> {
    let doodad = json!({
        "modelFileId": 1,
        "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
        "orientation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 },
        "scale": 1.0
    });

    let root = bytes(json!({
        "ambColor": { "b": 0, "g": 0, "r": 0, "a": 255 },
        "bounding_box": { "min": { "x": 0.0, "y": 0.0, "z": 0.0 }, "max": { "x": 1.0, "y": 1.0, "z": 1.0 } },
        "materials": [],
        "groupFileIds": [],
        "doodadSets": [
            { "name": "Set_$DefaultGlobal", "startIndex": 0, "count": 2 },
            { "name": "Set_Furniture", "startIndex": 2, "count": 1 },
            { "name": "Set_Party", "startIndex": 3, "count": 1 }
        ],
        "doodadDefs": [doodad.clone(), doodad.clone(), doodad.clone(), doodad]
    }));

    let root = JsonDecoder::default().decode_wmo_root(&root)?;
    assert_eq!(root.doodad_set_refs(0), vec![0, 1]);
    assert_eq!(root.doodad_set_refs(2), vec![0, 1, 3]);
    // unknown sets fall back to the default set
    assert_eq!(root.doodad_set_refs(9), vec![0, 1]);
    Ok(())
}
