// tests/load_tests.rs

use macroquad::color::{Color, WHITE};
use macroquad::texture::Image;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tmx_compose::{build_root, FsImageSource, LayerKind, Map, MapError, Resources, SceneOptions};

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tmx_compose_{tag}_{nanos}"));
    fs::create_dir_all(dir.join("tiles")).expect("failed to create temp dir");
    dir
}

const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="3" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" source="tiles/terrain.tsx"/>
 <layer id="1" name="ground" width="3" height="2">
  <data encoding="csv">1,2,3,
4,0,1</data>
 </layer>
 <objectgroup id="2" name="props">
  <object id="1" gid="2" x="16" y="32" width="16" height="16"/>
 </objectgroup>
</map>"#;

const TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" tilecount="4" columns="2">
 <image source="terrain.png" width="32" height="32"/>
</tileset>"#;

fn write_fixture(tag: &str) -> PathBuf {
    let dir = temp_dir(tag);
    fs::write(dir.join("level.tmx"), MAP).unwrap();
    fs::write(dir.join("tiles").join("terrain.tsx"), TSX).unwrap();
    dir
}

#[test]
fn integration_load_compose_from_files() -> anyhow::Result<()> {
    let dir = write_fixture("files");
    let png = dir.join("tiles").join("terrain.png");
    Image::gen_image_color(32, 32, Color::new(0.2, 0.4, 0.6, 1.0)).export_png(png.to_str().unwrap());

    let map = Map::load_from_file(dir.join("level.tmx"))?;
    assert_eq!(map.tilesets[0].name, "terrain");
    assert_eq!(map.tilesets[0].first_gid, 1);

    let resources = Resources::load(&map, &dir, &FsImageSource)?;
    let (_, path, image) = resources.images().next().expect("one image");
    assert_eq!(path, png.as_path());
    assert_eq!((image.width(), image.height()), (32, 32));

    let scene = build_root(&map, &resources, SceneOptions::default())?;
    let mut commands = Vec::new();
    scene.draw(&mut commands);
    // five non-empty cells and one tile object
    assert_eq!(commands.len(), 6);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn integration_load_from_str_resolves_relative_to_base_dir() -> anyhow::Result<()> {
    let dir = write_fixture("str");
    let map = Map::load_from_str(MAP, &dir)?;
    assert_eq!(map.tilesets[0].tile_count, 4);
    assert!(matches!(map.layers[0].kind, LayerKind::Tiles(_)));

    // without a base directory the reference stays unmerged
    let bare = Map::parse_str(MAP)?;
    assert!(bare.tilesets[0].is_unresolved());

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn integration_unsupported_format() {
    let err = Map::load_from_file("foo.json").unwrap_err();
    match err {
        MapError::Parse { context, .. } => assert_eq!(context, "foo.json"),
        other => panic!("expected Parse, got {:?}", other),
    }
}

#[test]
fn integration_missing_map_file() {
    let err = Map::load_from_file(std::env::temp_dir().join("does_not_exist_4711.tmx")).unwrap_err();
    assert!(matches!(err, MapError::Io { .. }));
}

#[test]
fn integration_corrupt_image_fails_to_decode() -> anyhow::Result<()> {
    let dir = write_fixture("corrupt");
    fs::write(dir.join("tiles").join("terrain.png"), b"definitely not a png")?;

    let map = Map::load_from_file(dir.join("level.tmx"))?;
    let err = Resources::load(&map, &dir, &FsImageSource).unwrap_err();
    assert!(matches!(err, MapError::ImageDecode { .. }));

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn integration_missing_image_is_an_io_error() -> anyhow::Result<()> {
    let dir = write_fixture("noimage");
    let map = Map::load_from_file(dir.join("level.tmx"))?;
    let err = Resources::load(&map, &dir, &FsImageSource).unwrap_err();
    assert!(matches!(err, MapError::Io { ref path, .. } if path.ends_with("terrain.png")));

    // the same map composes once images come from elsewhere
    let solid = |_: &std::path::Path| -> tmx_compose::Result<Image> { Ok(Image::gen_image_color(32, 32, WHITE)) };
    assert!(Resources::load(&map, &dir, &solid).is_ok());

    fs::remove_dir_all(&dir)?;
    Ok(())
}
