mod common;

use std::collections::HashSet;
use std::sync::Arc;

use sargerust_files::decoder::AssetDecoder;
use sargerust_files::extracted::JsonDecoder;
use sargerust_world::io::common::loader::ByteFetcher;
use sargerust_world::world::{ExpansionRequest, LazyWorldData};

use crate::common::{Fixture, read, tile};

#[tokio::test]
async fn the_start_window_is_resident_after_loading() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 8)?;

    let lazy = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(5, 5), 1).await?;

    let expected = tile(5, 5).window(1).collect::<HashSet<_>>();
    assert_eq!(lazy.resident_tiles(), &expected);
    assert_eq!(lazy.world.adts.len(), 9);
    assert_eq!(read(&fixture.decoder.adts), 9);
    assert!(!lazy.is_expanding());
    Ok(())
}

#[tokio::test]
async fn windows_are_clipped_to_the_map_and_the_wdt() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 3)?;

    let corner = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(0, 0), 1).await?;
    assert_eq!(corner.resident_tiles().len(), 4);

    // 3_x and x_3 do not exist in the WDT
    let edge = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(2, 2), 1).await?;
    assert_eq!(edge.resident_tiles().len(), 4);
    assert!(edge.is_resident(tile(1, 1)));
    assert!(!edge.is_resident(tile(3, 3)));
    Ok(())
}

#[tokio::test]
async fn expansions_only_load_missing_tiles() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 8)?;
    let mut lazy = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(5, 5), 1).await?;

    assert_eq!(lazy.request_expansion(tile(5, 5)), ExpansionRequest::AlreadyResident);

    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::Started);
    // one expansion at a time, the second request is dropped
    assert_eq!(lazy.request_expansion(tile(6, 6)), ExpansionRequest::InFlight);

    let outcome = lazy.finish_expansion().await.expect("an expansion was running");
    let merged = outcome.merged.iter().copied().collect::<HashSet<_>>();
    assert_eq!(merged, HashSet::from([tile(7, 4), tile(7, 5), tile(7, 6)]));
    assert!(outcome.failed.is_empty());
    assert!(!outcome.stale);

    assert_eq!(lazy.world.adts.len(), 12);
    assert_eq!(read(&fixture.decoder.adts), 12);
    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::AlreadyResident);
    assert!(lazy.finish_expansion().await.is_none());
    Ok(())
}

#[tokio::test]
async fn stale_expansions_stop_loading() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 8)?;
    let mut lazy = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(5, 5), 1).await?;

    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::Started);
    // the camera moves on before the expansion had a chance to run
    lazy.set_camera_tile(tile(1, 1));

    let outcome = lazy.finish_expansion().await.expect("an expansion was running");
    assert!(outcome.stale);
    assert!(outcome.merged.is_empty());
    assert_eq!(lazy.world.adts.len(), 9);

    // nothing has been marked as broken, the tiles are requested again
    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::Started);
    let outcome = lazy.finish_expansion().await.expect("an expansion was running");
    assert!(!outcome.stale);
    assert_eq!(outcome.merged.len(), 3);
    Ok(())
}

#[tokio::test]
async fn polling_merges_finished_expansions() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 8)?;
    let mut lazy = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(5, 5), 1).await?;

    assert_eq!(lazy.request_expansion(tile(5, 6)), ExpansionRequest::Started);
    let mut outcome = lazy.poll_expansion();
    while outcome.is_none() {
        tokio::task::yield_now().await;
        outcome = lazy.poll_expansion();
    }

    assert_eq!(outcome.map(|outcome| outcome.merged.len()), Some(3));
    assert!(!lazy.is_expanding());
    assert!(lazy.is_resident(tile(5, 7)));
    Ok(())
}

#[tokio::test]
async fn broken_tiles_are_reported_once() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 8)?;
    let mut lazy = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, tile(5, 5), 1).await?;

    let broken = lazy.world.tile_files(tile(7, 5)).expect("tile exists");
    fixture.store.fail(broken.tex0ADT);

    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::Started);
    let outcome = lazy.finish_expansion().await.expect("an expansion was running");
    assert_eq!(outcome.merged.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, tile(7, 5));
    assert_eq!(outcome.failed[0].1.root_file_id(), broken.tex0ADT);

    // failed tiles are not retried
    assert_eq!(lazy.request_expansion(tile(6, 5)), ExpansionRequest::AlreadyResident);
    assert_eq!(fixture.store.fetch_count(broken.tex0ADT), 1);
    assert!(!lazy.is_resident(tile(7, 5)));
    Ok(())
}

#[tokio::test]
async fn a_broken_start_window_fails_the_load() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(0, 0), 3)?;

    let root = JsonDecoder::default().decode_wmo_root(&fixture.store.fetch(world.wmo_id).await?)?;
    fixture.store.fail(root.groupFileIds[0]);

    let result = LazyWorldData::load(Arc::clone(&fixture.cache), world.wdt_id, world.center, 1).await;
    let err = result.err().expect("the building can't be loaded");
    assert!(format!("{err:#}").contains("Loading tile"), "{err:#}");
    Ok(())
}
