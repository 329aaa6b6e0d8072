// src/loader/tmx_loader.rs
use crate::color::parse_color;
use crate::error::{MapError, Result};
use crate::gid::TileInstance;
use crate::loader::xml::{parse_document, Element};
use crate::map::*;
use crate::properties::{Properties, PropertyValue};
use macroquad::math::{vec2, Vec2};
use std::path::{Path, PathBuf};

fn property_to_ir(el: &Element) -> Result<(String, PropertyValue)> {
    let name = el.attr("name").unwrap_or_default().to_owned();
    // Multi-line string properties keep their value in the element text.
    let raw = el.attr("value").unwrap_or(el.text.as_str());
    let context = || format!("property '{name}'");

    let value = match el.attr("type").unwrap_or("string") {
        "bool" => PropertyValue::Bool(matches!(raw, "true" | "1")),
        "int" | "object" => PropertyValue::I64(
            raw.parse()
                .map_err(|_| MapError::parse(context(), format!("'{raw}' is not an integer")))?,
        ),
        "float" => PropertyValue::F32(
            raw.parse()
                .map_err(|_| MapError::parse(context(), format!("'{raw}' is not a float")))?,
        ),
        "string" | "file" | "color" | "class" => PropertyValue::String(raw.to_owned()),
        other => {
            return Err(MapError::parse(
                context(),
                format!("unsupported property type '{other}'"),
            ))
        }
    };
    Ok((name, value))
}

fn properties_from(el: &Element) -> Result<Properties> {
    let mut out = Properties::new();
    if let Some(props) = el.child("properties") {
        for p in props.children_named("property") {
            let (name, value) = property_to_ir(p)?;
            out.insert(name, value);
        }
    }
    Ok(out)
}

fn image_to_ir(el: &Element) -> Result<ImageRef> {
    Ok(ImageRef {
        source: el.attr("source").unwrap_or_default().to_owned(),
        width: el.parse_attr("width")?,
        height: el.parse_attr("height")?,
    })
}

fn tileset_to_ir(el: &Element) -> Result<TileSet> {
    let tile_offset = match el.child("tileoffset") {
        Some(off) => vec2(off.parse_attr_or("x", 0.0)?, off.parse_attr_or("y", 0.0)?),
        None => Vec2::ZERO,
    };

    let tiles = el
        .children_named("tile")
        .map(|t| -> Result<TileDef> {
            Ok(TileDef {
                id: t.parse_attr_or("id", 0)?,
                class: t.attr("class").or_else(|| t.attr("type")).map(str::to_owned),
                image: t.child("image").map(image_to_ir).transpose()?,
                properties: properties_from(t)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TileSet {
        first_gid: el.parse_attr_or("firstgid", 0)?,
        source: el.attr("source").map(str::to_owned),
        name: el.attr("name").unwrap_or_default().to_owned(),
        tile_width: el.parse_attr_or("tilewidth", 0)?,
        tile_height: el.parse_attr_or("tileheight", 0)?,
        spacing: el.parse_attr_or("spacing", 0)?,
        margin: el.parse_attr_or("margin", 0)?,
        tile_count: el.parse_attr_or("tilecount", 0)?,
        columns: el.parse_attr_or("columns", 0)?,
        tile_offset,
        image: el.child("image").map(image_to_ir).transpose()?,
        tiles,
        properties: properties_from(el)?,
    })
}

/// A `<tileset>` inside the map, which must claim gids starting at 1 or above.
fn map_tileset_to_ir(el: &Element) -> Result<TileSet> {
    let context = || format!("tileset '{}'", el.attr("name").or(el.attr("source")).unwrap_or_default());
    match el.parse_attr::<u32>("firstgid")? {
        None => Err(MapError::parse(context(), "missing 'firstgid'")),
        Some(0) => Err(MapError::parse(context(), "'firstgid' must be at least 1")),
        Some(_) => tileset_to_ir(el),
    }
}

fn points_to_ir(raw: &str, object_id: u32) -> Result<Vec<Vec2>> {
    raw.split_whitespace()
        .map(|pair| {
            let bad = || MapError::parse(format!("object {object_id}"), format!("invalid point '{pair}'"));
            let (x, y) = pair.split_once(',').ok_or_else(bad)?;
            Ok(vec2(
                x.trim().parse().map_err(|_| bad())?,
                y.trim().parse().map_err(|_| bad())?,
            ))
        })
        .collect()
}

fn text_to_ir(el: &Element) -> Result<TextShape> {
    let defaults = TextShape::default();
    let color = match el.attr("color") {
        Some(c) => parse_color(c, "text object")?,
        None => defaults.color,
    };
    Ok(TextShape {
        text: el.text.clone(),
        font_family: el.attr("fontfamily").unwrap_or("sans-serif").to_owned(),
        pixel_size: el.parse_attr_or("pixelsize", defaults.pixel_size)?,
        wrap: el.bool_attr("wrap")?.unwrap_or(false),
        color,
        bold: el.bool_attr("bold")?.unwrap_or(false),
        italic: el.bool_attr("italic")?.unwrap_or(false),
        halign: match el.attr("halign") {
            Some("center") => HAlign::Center,
            Some("right") => HAlign::Right,
            Some("justify") => HAlign::Justify,
            _ => HAlign::Left,
        },
        valign: match el.attr("valign") {
            Some("center") => VAlign::Center,
            Some("bottom") => VAlign::Bottom,
            _ => VAlign::Top,
        },
    })
}

fn object_to_ir(el: &Element) -> Result<Object> {
    let id = el.parse_attr_or("id", 0)?;

    let mut shape = ObjectShape::Rectangle;
    for child in &el.children {
        shape = match child.name.as_str() {
            "properties" => continue,
            "ellipse" => ObjectShape::Ellipse,
            "point" => ObjectShape::Point,
            "polygon" => ObjectShape::Polygon(points_to_ir(child.attr("points").unwrap_or(""), id)?),
            "polyline" => ObjectShape::Polyline(points_to_ir(child.attr("points").unwrap_or(""), id)?),
            "text" => ObjectShape::Text(text_to_ir(child)?),
            other => ObjectShape::Unrecognized(other.to_owned()),
        };
        break;
    }

    let class = el
        .attr("class")
        .filter(|c| !c.is_empty())
        .or_else(|| el.attr("type"))
        .unwrap_or_default()
        .to_owned();

    Ok(Object {
        id,
        name: el.attr("name").unwrap_or_default().to_owned(),
        class,
        x: el.parse_attr_or("x", 0.0)?,
        y: el.parse_attr_or("y", 0.0)?,
        width: el.parse_attr("width")?,
        height: el.parse_attr("height")?,
        rotation: el.parse_attr("rotation")?,
        gid: el.parse_attr::<u32>("gid")?.map(TileInstance),
        visible: el.bool_attr("visible")?.unwrap_or(true),
        shape,
        properties: properties_from(el)?,
    })
}

fn data_to_ir(el: &Element) -> Result<TileData> {
    let records = el
        .children_named("tile")
        .map(|t| t.parse_attr_or("gid", 0u32))
        .collect::<Result<Vec<_>>>()?;
    Ok(TileData {
        encoding: el.attr("encoding").map(str::to_owned),
        compression: el.attr("compression").map(str::to_owned),
        payload: el.text.trim().to_owned(),
        records,
    })
}

fn layer_to_ir(el: &Element) -> Result<Layer> {
    let kind = match el.name.as_str() {
        "layer" => LayerKind::Tiles(el.child("data").map(data_to_ir).transpose()?.unwrap_or_default()),
        "objectgroup" => LayerKind::Objects(ObjectGroup {
            draw_order: match el.attr("draworder") {
                Some("index") => DrawOrder::Index,
                _ => DrawOrder::TopDown,
            },
            objects: el
                .children_named("object")
                .map(object_to_ir)
                .collect::<Result<Vec<_>>>()?,
        }),
        "imagelayer" => LayerKind::Image(
            el.child("image")
                .map(image_to_ir)
                .transpose()?
                .filter(|img| !img.source.is_empty()),
        ),
        "group" => LayerKind::Group(layers_to_ir(el)?),
        other => LayerKind::Unsupported(other.to_owned()),
    };

    Ok(Layer {
        id: el.parse_attr("id")?,
        name: el.attr("name").unwrap_or_default().to_owned(),
        width: el.parse_attr("width")?,
        height: el.parse_attr("height")?,
        offset: vec2(el.parse_attr_or("offsetx", 0.0)?, el.parse_attr_or("offsety", 0.0)?),
        opacity: el.parse_attr("opacity")?,
        visible: el.bool_attr("visible")?,
        tint: el
            .attr("tintcolor")
            .or_else(|| el.attr("color"))
            .map(str::to_owned),
        properties: properties_from(el)?,
        kind,
    })
}

/// Layer children of a `<map>` or `<group>`, in document order.
fn layers_to_ir(parent: &Element) -> Result<Vec<Layer>> {
    parent
        .children
        .iter()
        .filter(|c| !matches!(c.name.as_str(), "properties" | "tileset" | "editorsettings"))
        .map(layer_to_ir)
        .collect()
}

fn map_to_ir(root: &Element) -> Result<Map> {
    if root.name != "map" {
        return Err(MapError::parse(
            "document",
            format!("expected <map> root element, found <{}>", root.name),
        ));
    }

    let width: u32 = root.parse_attr_or("width", 0)?;
    let height: u32 = root.parse_attr_or("height", 0)?;
    let tile_width: u32 = root.parse_attr_or("tilewidth", 0)?;
    let tile_height: u32 = root.parse_attr_or("tileheight", 0)?;
    if width == 0 || height == 0 || tile_width == 0 || tile_height == 0 {
        return Err(MapError::parse(
            "<map>",
            format!("map dimensions must be positive ({width}x{height} cells of {tile_width}x{tile_height})"),
        ));
    }
    if width.checked_mul(tile_width).is_none() || height.checked_mul(tile_height).is_none() {
        return Err(MapError::parse(
            "<map>",
            format!("pixel size of {width}x{height} cells of {tile_width}x{tile_height} overflows"),
        ));
    }

    let background_color = root
        .attr("backgroundcolor")
        .map(|c| parse_color(c, "map background"))
        .transpose()?;

    let mut tilesets = root
        .children_named("tileset")
        .map(map_tileset_to_ir)
        .collect::<Result<Vec<_>>>()?;
    // Sort by first_gid to make resolution order well-defined
    tilesets.sort_by_key(|t| t.first_gid);

    Ok(Map {
        version: root.attr("version").unwrap_or_default().to_owned(),
        orientation: root.attr("orientation").unwrap_or("orthogonal").to_owned(),
        width,
        height,
        tile_width,
        tile_height,
        background_color,
        properties: properties_from(root)?,
        tilesets,
        layers: layers_to_ir(root)?,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn rebase(source: &str, dir: &Path) -> String {
    if source.is_empty() || Path::new(source).is_absolute() {
        return source.to_owned();
    }
    dir.join(source).to_string_lossy().into_owned()
}

/// Overlays a `.tsx` file onto the referencing entry, keeping its `firstgid`.
fn merge_external_tileset(ts: &mut TileSet, map_dir: &Path) -> Result<()> {
    let Some(source) = ts.source.clone() else {
        return Ok(());
    };
    let tsx_path = map_dir.join(&source);
    let txt = read_file(&tsx_path)?;
    let root = parse_document(&txt, &tsx_path.to_string_lossy())?;
    if root.name != "tileset" {
        return Err(MapError::parse(
            tsx_path.to_string_lossy(),
            format!("expected <tileset> root element, found <{}>", root.name),
        ));
    }

    let mut ext = tileset_to_ir(&root)?;
    // Images in the .tsx are relative to the .tsx itself
    let rel_dir = Path::new(&source).parent().map(Path::to_path_buf).unwrap_or_default();
    if let Some(img) = ext.image.as_mut() {
        img.source = rebase(&img.source, &rel_dir);
    }
    for tile in &mut ext.tiles {
        if let Some(img) = tile.image.as_mut() {
            img.source = rebase(&img.source, &rel_dir);
        }
    }

    ext.first_gid = ts.first_gid;
    ext.source = Some(source);
    *ts = ext;
    Ok(())
}

pub(crate) fn load_map_str(xml: &str, base_dir: Option<&Path>) -> Result<Map> {
    let root = parse_document(xml, "map document")?;
    let mut map = map_to_ir(&root)?;

    if let Some(dir) = base_dir {
        for ts in &mut map.tilesets {
            merge_external_tileset(ts, dir)?;
        }
    }

    log::debug!(
        "loaded {}x{} map with {} tile sets and {} root layers",
        map.width,
        map.height,
        map.tilesets.len(),
        map.layers.len()
    );
    Ok(map)
}

pub(crate) fn load_map_file(path: &Path) -> Result<Map> {
    if path.extension().and_then(|e| e.to_str()) != Some("tmx") {
        return Err(MapError::parse(
            path.to_string_lossy(),
            "map file must be a .tmx file",
        ));
    }
    let txt = read_file(path)?;
    let map_dir = path
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));
    load_map_str(&txt, Some(&map_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("tmx_loader_{nanos}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir
    }

    const MAP_WITH_EVERYTHING: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16" backgroundcolor="#336699">
 <properties>
  <property name="is_night" type="bool" value="true"/>
  <property name="gravity" type="float" value="9.8"/>
  <property name="theme" value="forest"/>
 </properties>
 <tileset firstgid="1" source="tiles/terrain.tsx"/>
 <layer id="1" name="ground" width="2" height="2" opacity="0.5" offsetx="4" offsety="-2">
  <properties><property name="difficulty" type="int" value="3"/></properties>
  <data encoding="csv">
1,0,
0,2147483649
</data>
 </layer>
 <objectgroup id="2" name="spawns" draworder="index" tintcolor="#80ff0000">
  <object id="7" name="spawn" type="player" x="8" y="12" width="16" height="8" rotation="45"/>
  <object id="8" x="1" y="2"><point/></object>
  <object id="9" x="0" y="0"><polygon points="0,0 16,0 8,-8"/></object>
  <object id="10" x="0" y="0" width="64" height="20"><text pixelsize="12" wrap="1" halign="center" color="#ff00ff00">Hello</text></object>
  <object id="11" x="0" y="0" gid="1" width="16" height="16" visible="0"/>
  <object id="12" x="0" y="0"><capsule/></object>
 </objectgroup>
 <group name="g" visible="0">
  <imagelayer name="bg"><image source="bg.png" width="32" height="32"/></imagelayer>
  <imagelayer name="empty"/>
 </group>
</map>
"##;

    const TERRAIN_TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" name="terrain" tilewidth="16" tileheight="16" spacing="1" margin="2" tilecount="4" columns="2">
 <tileoffset x="0" y="4"/>
 <properties><property name="biome" value="forest"/></properties>
 <image source="terrain.png" width="36" height="36"/>
 <tile id="0"><properties><property name="damage" type="int" value="10"/></properties></tile>
</tileset>
"#;

    fn write_fixture() -> PathBuf {
        let dir = temp_dir();
        fs::create_dir_all(dir.join("tiles")).unwrap();
        fs::write(dir.join("map.tmx"), MAP_WITH_EVERYTHING).unwrap();
        fs::write(dir.join("tiles/terrain.tsx"), TERRAIN_TSX).unwrap();
        dir
    }

    #[test]
    fn parses_map_metadata_and_properties() {
        let dir = write_fixture();
        let map = Map::load_from_file(dir.join("map.tmx")).expect("load");

        assert_eq!((map.width, map.height, map.tile_width, map.tile_height), (2, 2, 16, 16));
        assert_eq!(map.pixel_height(), 32);
        assert!(map.background_color.is_some());
        assert_eq!(map.properties.get_bool("is_night"), Some(true));
        assert_eq!(map.properties.get_f32("gravity"), Some(9.8));
        assert_eq!(map.properties.get_string("theme"), Some("forest"));
    }

    #[test]
    fn merges_external_tileset_but_keeps_firstgid() {
        let dir = write_fixture();
        let map = Map::load_from_file(dir.join("map.tmx")).expect("load");

        let ts = &map.tilesets[0];
        assert_eq!(ts.first_gid, 1);
        assert_eq!(ts.name, "terrain");
        assert_eq!((ts.spacing, ts.margin, ts.tile_count, ts.columns), (1, 2, 4, 2));
        assert_eq!(ts.tile_offset, vec2(0.0, 4.0));
        assert_eq!(ts.properties.get_string("biome"), Some("forest"));
        assert_eq!(ts.tiles[0].properties.get_i32("damage"), Some(10));
        let img = ts.image.as_ref().unwrap();
        assert_eq!(Path::new(&img.source), Path::new("tiles").join("terrain.png"));
    }

    #[test]
    fn parse_str_leaves_external_tileset_unresolved() {
        let map = Map::parse_str(MAP_WITH_EVERYTHING).expect("parse");
        assert!(map.tilesets[0].is_unresolved());
        assert_eq!(map.tilesets[0].source.as_deref(), Some("tiles/terrain.tsx"));
    }

    #[test]
    fn parses_layers_in_document_order() {
        let map = Map::parse_str(MAP_WITH_EVERYTHING).expect("parse");
        let kinds: Vec<&str> = map.layers.iter().map(|l| l.kind.name()).collect();
        assert_eq!(kinds, ["layer", "objectgroup", "group"]);

        let ground = &map.layers[0];
        assert_eq!(ground.opacity, Some(0.5));
        assert_eq!(ground.offset, vec2(4.0, -2.0));
        assert_eq!(ground.properties.get_i32("difficulty"), Some(3));
        match &ground.kind {
            LayerKind::Tiles(data) => {
                assert_eq!(data.encoding.as_deref(), Some("csv"));
                assert!(data.payload.starts_with("1,0,"));
            }
            other => panic!("expected tile layer, got {other:?}"),
        }

        let group = &map.layers[2];
        assert_eq!(group.visible, Some(false));
        match &group.kind {
            LayerKind::Group(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0].kind, LayerKind::Image(Some(img)) if img.source == "bg.png"));
                assert!(matches!(&children[1].kind, LayerKind::Image(None)));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn parses_objects_and_shapes() {
        let map = Map::parse_str(MAP_WITH_EVERYTHING).expect("parse");
        let group = match &map.layers[1].kind {
            LayerKind::Objects(g) => g,
            other => panic!("expected object group, got {other:?}"),
        };
        assert_eq!(group.draw_order, DrawOrder::Index);
        assert_eq!(map.layers[1].tint.as_deref(), Some("#80ff0000"));

        let o = &group.objects;
        assert_eq!(o[0].class, "player");
        assert_eq!(o[0].size(), Some(vec2(16.0, 8.0)));
        assert_eq!(o[0].rotation, Some(45.0));
        assert_eq!(o[0].shape, ObjectShape::Rectangle);
        assert_eq!(o[1].shape, ObjectShape::Point);
        assert_eq!(
            o[2].shape,
            ObjectShape::Polygon(vec![vec2(0.0, 0.0), vec2(16.0, 0.0), vec2(8.0, -8.0)])
        );
        match &o[3].shape {
            ObjectShape::Text(t) => {
                assert_eq!(t.text, "Hello");
                assert_eq!(t.pixel_size, 12);
                assert!(t.wrap);
                assert_eq!(t.halign, HAlign::Center);
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(o[4].gid, Some(TileInstance(1)));
        assert!(!o[4].visible);
        assert_eq!(o[5].shape, ObjectShape::Unrecognized("capsule".into()));
    }

    #[test]
    fn parses_structured_tile_records() {
        let xml = r#"<map width="2" height="1" tilewidth="8" tileheight="8">
            <layer name="l"><data><tile gid="3"/><tile/></data></layer></map>"#;
        let map = Map::parse_str(xml).unwrap();
        match &map.layers[0].kind {
            LayerKind::Tiles(data) => {
                assert_eq!(data.encoding, None);
                assert_eq!(data.records, vec![3, 0]);
            }
            other => panic!("expected tile layer, got {other:?}"),
        }
    }

    #[test]
    fn keeps_unknown_layer_elements_for_the_scene_builder() {
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
            <editorsettings/><properties/><heightfield name="h"/></map>"#;
        let map = Map::parse_str(xml).unwrap();
        assert_eq!(map.layers.len(), 1);
        assert_eq!(map.layers[0].kind, LayerKind::Unsupported("heightfield".into()));
    }

    #[test]
    fn returns_typed_error_for_malformed_xml() {
        let err = Map::parse_str("<map width=\"1\"").unwrap_err();
        assert!(matches!(err, MapError::Parse { .. }));
    }

    #[test]
    fn rejects_zero_sized_maps() {
        let err = Map::parse_str(r#"<map width="0" height="1" tilewidth="8" tileheight="8"/>"#).unwrap_err();
        assert!(matches!(err, MapError::Parse { .. }));
    }

    #[test]
    fn rejects_maps_whose_pixel_size_overflows() {
        let err = Map::parse_str(r#"<map width="1" height="70000" tilewidth="8" tileheight="70000"/>"#)
            .unwrap_err();
        assert!(matches!(err, MapError::Parse { ref context, .. } if context == "<map>"));
    }

    #[test]
    fn map_tilesets_need_a_positive_firstgid() {
        for firstgid in ["", r#"firstgid="0""#] {
            let xml = format!(
                r#"<map width="1" height="1" tilewidth="16" tileheight="16">
                     <tileset {firstgid} name="t" tilewidth="16" tileheight="16" tilecount="1" columns="1">
                       <image source="t.png"/>
                     </tileset>
                   </map>"#
            );
            match Map::parse_str(&xml).unwrap_err() {
                MapError::Parse { context, .. } => assert_eq!(context, "tileset 't'"),
                other => panic!("expected Parse, got {other:?}"),
            }
        }
    }

    #[test]
    fn text_objects_keep_their_whitespace() {
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
              <objectgroup name="o">
                <object id="1" x="0" y="0" width="40" height="10"><text> indented
  second line </text></object>
              </objectgroup>
              <layer name="g" width="1" height="1"><data encoding="csv">
                3
              </data></layer>
            </map>"#;
        let map = Map::parse_str(xml).unwrap();
        let LayerKind::Objects(group) = &map.layers[0].kind else {
            panic!("expected an object group")
        };
        match &group.objects[0].shape {
            ObjectShape::Text(t) => assert_eq!(t.text, " indented\n  second line "),
            other => panic!("expected text, got {other:?}"),
        }
        let LayerKind::Tiles(data) = &map.layers[1].kind else {
            panic!("expected a tile layer")
        };
        assert_eq!(data.payload, "3");
    }

    #[test]
    fn returns_typed_error_for_missing_tileset_file() {
        let dir = temp_dir();
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
            <tileset firstgid="1" source="missing.tsx"/></map>"#;
        let err = Map::load_from_str(xml, &dir).unwrap_err();
        assert!(matches!(err, MapError::Io { .. }));
    }

    #[test]
    fn returns_typed_error_for_unknown_property_type() {
        let xml = r#"<map width="1" height="1" tilewidth="8" tileheight="8">
            <properties><property name="mystery" type="not_supported" value="x"/></properties></map>"#;
        let err = Map::parse_str(xml).unwrap_err();
        assert!(matches!(err, MapError::Parse { ref context, .. } if context.contains("mystery")));
    }

    #[test]
    fn rejects_non_tmx_paths() {
        let err = Map::load_from_file("foo.json").unwrap_err();
        assert!(matches!(err, MapError::Parse { .. }));
    }
}
