mod common;

use std::sync::Arc;

use sargerust_files::decoder::AssetDecoder;
use sargerust_files::extracted::JsonDecoder;
use sargerust_world::demos::DemoWmo;
use sargerust_world::io::common::loader::ByteFetcher;
use sargerust_world::rendering::asset_graph::error::AssetError;
use sargerust_world::rendering::asset_graph::nodes::model_node::ModelData;
use sargerust_world::world::WorldData;
use tokio::task::JoinSet;

use crate::common::{Fixture, read, tile};

#[tokio::test]
async fn concurrent_requests_load_a_model_once() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let texture = fixture.store.add_texture(16, 0xFF00FF00)?;
    let model_id = fixture.store.add_model("Shared", 1.0, texture, true)?;

    let mut requests = JoinSet::new();
    for _ in 0..8 {
        let cache = Arc::clone(&fixture.cache);
        requests.spawn(async move { cache.get_model(model_id).await });
    }

    let models = requests
        .join_all()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(models.len(), 8);
    assert!(models.iter().all(|model| Arc::ptr_eq(model, &models[0])));
    assert_eq!(fixture.store.fetch_count(model_id), 1);
    assert_eq!(read(&fixture.decoder.models), 1);
    assert_eq!(read(&fixture.decoder.skins), 1);
    assert_eq!(read(&fixture.decoder.textures), 1);
    Ok(())
}

#[tokio::test]
async fn shared_textures_are_loaded_once() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let texture = fixture.store.add_texture(16, 0xFF00FF00)?;
    let first = fixture.store.add_model("First", 1.0, texture, false)?;
    let second = fixture.store.add_model("Second", 2.0, texture, false)?;

    let (first, second) = tokio::join!(fixture.cache.get_model(first), fixture.cache.get_model(second));
    let (first, second) = (first?, second?);

    let texture_of = |model: &ModelData| model.textures[0].texture.clone();
    let (Some(a), Some(b)) = (texture_of(&first), texture_of(&second)) else {
        panic!("both models resolve their texture");
    };
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(fixture.store.fetch_count(texture), 1);
    assert_eq!(fixture.cache.stats().textures, 1);
    Ok(())
}

#[tokio::test]
async fn failed_loads_are_cached_and_name_their_cause() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let model_id = fixture.store.add_model("Broken", 1.0, 0, false)?;
    let skin_id = JsonDecoder::default()
        .decode_m2(&fixture.store.fetch(model_id).await?)?
        .skin_file_ids[0];
    fixture.store.remove(skin_id);

    let first = fixture.cache.get_model(model_id).await;
    let second = fixture.cache.get_model(model_id).await;

    let Err(err) = first else {
        panic!("a model without its skin can't load");
    };
    assert!(matches!(err, AssetError::Dependency { file_id, .. } if file_id == model_id));
    assert_eq!(err.root_file_id(), skin_id);
    assert_eq!(second.err(), Some(err));

    // once for the skin lookup above, once by the cache: the failure is remembered
    assert_eq!(fixture.store.fetch_count(model_id), 2);
    assert_eq!(fixture.store.fetch_count(skin_id), 1);
    assert!(fixture.cache.model(model_id).is_none());
    assert_eq!(fixture.cache.stats().models, 1);
    Ok(())
}

#[tokio::test]
async fn missing_textures_do_not_fail_the_model() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let texture = fixture.store.add_texture(16, 0xFF00FF00)?;
    fixture.store.fail(texture);
    let model_id = fixture.store.add_model("Untextured", 1.0, texture, false)?;

    let model = fixture.cache.get_model(model_id).await?;
    assert!(model.textures[0].is_missing());
    assert!(fixture.cache.texture(texture).is_none());

    let skin = model.active_skin().expect("one skin");
    assert!(!skin.render_passes[0].is_drawable(&model));
    Ok(())
}

#[tokio::test]
async fn a_failing_group_fails_the_wmo() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let texture = fixture.store.add_texture(16, 0xFFFFFFFF)?;
    let lamp = fixture.store.add_model("Lamp", 0.5, texture, false)?;
    let wmo_id = fixture.store.add_wmo(&DemoWmo {
        groups: 2,
        group_half_extent: 10.0,
        texture_id: texture,
        doodad_models: vec![lamp],
        referenced_doodads: 1,
    })?;

    let group_id = JsonDecoder::default()
        .decode_wmo_root(&fixture.store.fetch(wmo_id).await?)?
        .groupFileIds[1];
    fixture.store.fail(group_id);

    let err = fixture
        .cache
        .get_wmo(wmo_id)
        .await
        .expect_err("the group is unavailable");
    assert_eq!(err.root_file_id(), group_id);
    Ok(())
}

#[tokio::test]
async fn failing_doodad_models_leave_a_gap() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let texture = fixture.store.add_texture(16, 0xFFFFFFFF)?;
    let lamp = fixture.store.add_model("Lamp", 0.5, texture, false)?;
    let barrel = fixture.store.add_model("Barrel", 0.5, texture, false)?;
    fixture.store.fail(barrel);
    let wmo_id = fixture.store.add_wmo(&DemoWmo {
        groups: 1,
        group_half_extent: 10.0,
        texture_id: texture,
        doodad_models: vec![lamp, barrel],
        referenced_doodads: 2,
    })?;

    let wmo = fixture.cache.get_wmo(wmo_id).await?;
    assert_eq!(wmo.models.len(), 1);
    assert!(wmo.models.contains_key(&lamp));
    assert_eq!(wmo.doodad_defs.len(), 2);
    Ok(())
}

#[tokio::test]
async fn a_world_decodes_every_asset_once() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let world = fixture.world(tile(10, 10), 3)?;

    let loaded = WorldData::load(&fixture.cache, world.wdt_id, 150.0).await?;
    assert_eq!(loaded.adts.len(), 9);

    // the WMO doodads use the same models as the tiles
    assert_eq!(read(&fixture.decoder.models), world.models.len());
    assert_eq!(read(&fixture.decoder.skins), world.models.len());
    assert_eq!(read(&fixture.decoder.wmo_roots), 1);
    assert_eq!(read(&fixture.decoder.wmo_groups), 2);
    assert_eq!(read(&fixture.decoder.adts), 9);
    assert_eq!(read(&fixture.decoder.textures), world.textures.len());
    for &model_id in &world.models {
        assert_eq!(fixture.store.fetch_count(model_id), 1, "model {}", model_id);
    }

    // the building is referenced by two tiles, but only placed once
    let placed = loaded
        .adts
        .iter()
        .map(|adt| adt.lods[0].wmo_defs.len())
        .sum::<usize>();
    assert_eq!(placed, 1);
    Ok(())
}

#[tokio::test]
async fn clearing_the_cache_forgets_every_asset() -> Result<(), anyhow::Error> {
    let fixture = Fixture::new();
    let model_id = fixture.store.add_model("Crate", 1.0, 0, false)?;

    let model = fixture.cache.get_model(model_id).await?;
    fixture.cache.clear();
    assert_eq!(fixture.cache.stats().models, 0);
    assert!(fixture.cache.loaded_models().is_empty());

    // references that are still held stay valid
    assert_eq!(model.file_id, model_id);
    let reloaded = fixture.cache.get_model(model_id).await?;
    assert!(!Arc::ptr_eq(&model, &reloaded));
    assert_eq!(fixture.store.fetch_count(model_id), 2);
    Ok(())
}
