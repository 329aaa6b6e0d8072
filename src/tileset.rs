//! Tile set resolution: global id → (image, source rectangle).
//!
//! Images are decoded once through an [`ImageSource`] and shared by every
//! compositor through [`ImageHandle`]s. The gid table maps every cleaned
//! gid a tile set claims to its entry, built eagerly at load time.

use crate::error::{MapError, Result};
use crate::gid::GID_MASK;
use crate::map::{LayerKind, Map, TileSet};
use macroquad::math::{Rect, Vec2};
use macroquad::texture::Image;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Index of a decoded image inside [`Resources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub(crate) usize);

impl ImageHandle {
    /// Position in [`Resources::images`]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Everything needed to draw one global tile id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileSetEntry {
    /// First gid of the owning tile set
    pub first_gid: u32,
    /// Position of the owning tile set in [`Map::tilesets`]
    pub tileset: usize,
    /// Image holding the tile
    pub image: ImageHandle,
    /// Pixel rectangle inside the image
    pub source: Rect,
    /// The owning set's `tileoffset`
    pub offset: Vec2,
}

/// Decodes image files. The library never decodes pixels itself.
pub trait ImageSource {
    /// Loads the image at `path` (already joined with the map directory).
    fn load(&self, path: &Path) -> Result<Image>;
}

impl<F> ImageSource for F
where
    F: Fn(&Path) -> Result<Image>,
{
    fn load(&self, path: &Path) -> Result<Image> {
        self(path)
    }
}

/// Reads images from disk and decodes them with macroquad's decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageSource;

impl ImageSource for FsImageSource {
    fn load(&self, path: &Path) -> Result<Image> {
        let bytes = std::fs::read(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Image::from_file_with_format(&bytes, None).map_err(|e| MapError::ImageDecode {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        })
    }
}

/// Decoded images plus the gid lookup table of one map.
///
/// Read-only once built.
pub struct Resources {
    images: Vec<Image>,
    paths: Vec<PathBuf>,
    by_source: HashMap<String, ImageHandle>,
    gid_lut: HashMap<u32, TileSetEntry>,
}

impl std::fmt::Debug for Resources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resources")
            .field("images", &self.paths)
            .field("gids", &self.gid_lut.len())
            .finish()
    }
}

/// Number of gids a tile set claims. Image collections may have id gaps.
fn gid_span(ts: &TileSet) -> u32 {
    let max_listed = ts
        .tiles
        .iter()
        .filter(|t| t.image.is_some())
        .map(|t| t.id.saturating_add(1))
        .max()
        .unwrap_or(0);
    ts.tile_count.max(max_listed)
}

/// Gids `ts` claims. Fails when the range starts at the reserved empty gid
/// 0 or leaves the 29 bits a gid has next to its flip flags.
fn gid_range(ts: &TileSet) -> Result<std::ops::Range<u32>> {
    let end = u64::from(ts.first_gid) + u64::from(gid_span(ts));
    if ts.first_gid == 0 || end > u64::from(GID_MASK) + 1 {
        return Err(MapError::parse(
            format!("tileset '{}'", ts.name),
            format!("gids {}..{end} are outside 1..={GID_MASK}", ts.first_gid),
        ));
    }
    Ok(ts.first_gid..end as u32)
}

impl Resources {
    /// Decodes every image `map` references (tile sets and image layers)
    /// and builds the gid table. Image paths are joined with `base_dir`.
    pub fn load(map: &Map, base_dir: impl AsRef<Path>, source: &dyn ImageSource) -> Result<Self> {
        let mut res = Resources {
            images: Vec::new(),
            paths: Vec::new(),
            by_source: HashMap::new(),
            gid_lut: HashMap::new(),
        };
        let base_dir = base_dir.as_ref();

        for ts in &map.tilesets {
            gid_range(ts)?;
        }

        let mut order: Vec<usize> = (0..map.tilesets.len()).collect();
        order.sort_by_key(|&i| map.tilesets[i].first_gid);
        for pair in order.windows(2) {
            let (a, b) = (&map.tilesets[pair[0]], &map.tilesets[pair[1]]);
            if gid_range(a)?.end > b.first_gid {
                return Err(MapError::OverlappingTileSets {
                    first: a.name.clone(),
                    second: b.name.clone(),
                });
            }
        }

        for (index, ts) in map.tilesets.iter().enumerate() {
            if ts.is_unresolved() {
                return Err(MapError::parse(
                    format!("tileset '{}'", ts.name),
                    format!(
                        "external tile set '{}' was not loaded",
                        ts.source.as_deref().unwrap_or_default()
                    ),
                ));
            }
            match &ts.image {
                Some(img) => res.add_atlas(index, ts, &img.source, base_dir, source)?,
                None => res.add_collection(index, ts, base_dir, source)?,
            }
        }

        for layer in map.layers_recursive() {
            if let LayerKind::Image(Some(img)) = &layer.kind {
                res.get_or_load(&img.source, base_dir, source)?;
            }
        }

        log::debug!(
            "resolved {} tile sets, {} images, {} gids",
            map.tilesets.len(),
            res.images.len(),
            res.gid_lut.len()
        );
        Ok(res)
    }

    fn get_or_load(&mut self, rel: &str, base_dir: &Path, source: &dyn ImageSource) -> Result<ImageHandle> {
        if let Some(&h) = self.by_source.get(rel) {
            return Ok(h);
        }
        let path = base_dir.join(rel);
        let image = source.load(&path)?;
        let handle = ImageHandle(self.images.len());
        self.images.push(image);
        self.paths.push(path);
        self.by_source.insert(rel.to_owned(), handle);
        Ok(handle)
    }

    fn add_atlas(
        &mut self,
        index: usize,
        ts: &TileSet,
        rel: &str,
        base_dir: &Path,
        source: &dyn ImageSource,
    ) -> Result<()> {
        if ts.tile_width == 0 || ts.tile_height == 0 {
            return Err(MapError::parse(
                format!("tileset '{}'", ts.name),
                "tile size must be positive",
            ));
        }
        let handle = self.get_or_load(rel, base_dir, source)?;
        let (img_w, img_h) = {
            let img = &self.images[handle.0];
            (img.width() as u32, img.height() as u32)
        };

        // Document values are arbitrary u32s; u64 holds every sum below.
        let (tw, th) = (u64::from(ts.tile_width), u64::from(ts.tile_height));
        let (margin, spacing) = (u64::from(ts.margin), u64::from(ts.spacing));
        let columns = if ts.columns > 0 {
            u64::from(ts.columns)
        } else {
            (u64::from(img_w).saturating_sub(2 * margin) + spacing) / (tw + spacing)
        }
        .max(1);

        let mut outside = Vec::new();
        for local in 0..ts.tile_count {
            let (col, row) = (u64::from(local) % columns, u64::from(local) / columns);
            let x = margin + col * (tw + spacing);
            let y = margin + row * (th + spacing);
            if x + tw > u64::from(img_w) || y + th > u64::from(img_h) {
                outside.push(local);
                continue;
            }
            self.gid_lut.insert(ts.first_gid + local, TileSetEntry {
                first_gid: ts.first_gid,
                tileset: index,
                image: handle,
                source: Rect::new(x as f32, y as f32, tw as f32, th as f32),
                offset: ts.tile_offset,
            });
        }

        if !outside.is_empty() {
            return Err(MapError::TileOutOfBounds {
                tileset: ts.name.clone(),
                tiles: outside,
                image_width: img_w,
                image_height: img_h,
            });
        }
        Ok(())
    }

    fn add_collection(
        &mut self,
        index: usize,
        ts: &TileSet,
        base_dir: &Path,
        source: &dyn ImageSource,
    ) -> Result<()> {
        for tile in &ts.tiles {
            let Some(img) = &tile.image else { continue };
            let handle = self.get_or_load(&img.source, base_dir, source)?;
            let decoded = &self.images[handle.0];
            self.gid_lut.insert(ts.first_gid + tile.id, TileSetEntry {
                first_gid: ts.first_gid,
                tileset: index,
                image: handle,
                source: Rect::new(0.0, 0.0, decoded.width() as f32, decoded.height() as f32),
                offset: ts.tile_offset,
            });
        }
        Ok(())
    }

    /// Entry for a cleaned gid. Gid 0 (empty) never has one.
    pub fn entry(&self, gid: u32) -> Option<&TileSetEntry> {
        self.gid_lut.get(&gid)
    }

    /// Decoded image behind `handle`.
    ///
    /// # Panics
    /// When `handle` comes from another `Resources`.
    pub fn image(&self, handle: ImageHandle) -> &Image {
        &self.images[handle.0]
    }

    /// Handle of an image referenced by the document (path as written,
    /// relative to the map directory).
    pub fn handle_for(&self, source: &str) -> Option<ImageHandle> {
        self.by_source.get(source).copied()
    }

    /// Every decoded image with its resolved path, in load order.
    pub fn images(&self) -> impl Iterator<Item = (ImageHandle, &Path, &Image)> + '_ {
        self.images
            .iter()
            .zip(&self.paths)
            .enumerate()
            .map(|(i, (img, path))| (ImageHandle(i), path.as_path(), img))
    }
}
