//! Preload stage: the asset manifest the scene declares and the decoded
//! catalog create/render read from.
//!
//! Loading is all-or-nothing. `AssetManifest::load` either returns a catalog
//! holding every declared image or the first error; the scene is never created
//! from a partial catalog.

use glam::Vec2;
use image::RgbaImage;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const SKY: &str = "sky";
pub const GROUND: &str = "ground";
pub const STAR: &str = "star";
pub const BOMB: &str = "bomb";
pub const DUDE: &str = "dude";

pub const DUDE_FRAME_WIDTH: u32 = 32;
pub const DUDE_FRAME_HEIGHT: u32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    SpriteSheet { frame_width: u32, frame_height: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDecl {
    pub key: String,
    /// Relative to the asset root.
    pub path: String,
    pub kind: AssetKind,
}

#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    decls: Vec<AssetDecl>,
}

impl AssetManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&mut self, key: &str, path: &str) -> &mut Self {
        self.decls.push(AssetDecl {
            key: key.to_string(),
            path: path.to_string(),
            kind: AssetKind::Image,
        });
        self
    }

    pub fn spritesheet(
        &mut self,
        key: &str,
        path: &str,
        frame_width: u32,
        frame_height: u32,
    ) -> &mut Self {
        self.decls.push(AssetDecl {
            key: key.to_string(),
            path: path.to_string(),
            kind: AssetKind::SpriteSheet {
                frame_width,
                frame_height,
            },
        });
        self
    }

    #[cfg(test)]
    pub fn decls(&self) -> &[AssetDecl] {
        &self.decls
    }

    /// Read and decode every declared asset under `root`.
    pub fn load(&self, root: &Path) -> Result<AssetCatalog, String> {
        let mut catalog = AssetCatalog::new();
        for decl in &self.decls {
            let path = root.join(&decl.path);
            let bytes = fs::read(&path).map_err(|e| {
                format!("Failed to read asset '{}' ({}): {e}", decl.key, path.display())
            })?;
            let image = image::load_from_memory(&bytes)
                .map_err(|e| {
                    format!("Failed to decode asset '{}' ({}): {e}", decl.key, path.display())
                })?
                .to_rgba8();

            match decl.kind {
                AssetKind::Image => catalog.insert_image(&decl.key, image)?,
                AssetKind::SpriteSheet {
                    frame_width,
                    frame_height,
                } => catalog.insert_spritesheet(&decl.key, image, frame_width, frame_height)?,
            }
        }
        log::info!(
            "Preloaded {} assets from {}",
            catalog.len(),
            root.display()
        );
        Ok(catalog)
    }
}

/// Everything the scene loads before create runs.
pub fn preload() -> AssetManifest {
    let mut manifest = AssetManifest::new();
    manifest
        .image(SKY, "sky.png")
        .image(GROUND, "platform.png")
        .image(STAR, "star.png")
        .image(BOMB, "bomb.png")
        .spritesheet(DUDE, "dude.png", DUDE_FRAME_WIDTH, DUDE_FRAME_HEIGHT);
    manifest
}

/// Uniform grid of frames over one image, numbered left-to-right then
/// top-to-bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSheet {
    /// Full image size; trailing pixels past the last whole frame are kept.
    pub image_width: u32,
    pub image_height: u32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: u32,
    pub rows: u32,
}

impl SpriteSheet {
    pub fn slice(
        image_width: u32,
        image_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Self, String> {
        if frame_width == 0 || frame_height == 0 {
            return Err("Sprite sheet validation failed: frame size must be > 0".to_string());
        }
        let columns = image_width / frame_width;
        let rows = image_height / frame_height;
        if columns == 0 || rows == 0 {
            return Err(format!(
                "Sprite sheet validation failed: {image_width}x{image_height} image is smaller than one {frame_width}x{frame_height} frame"
            ));
        }
        Ok(Self {
            image_width,
            image_height,
            frame_width,
            frame_height,
            columns,
            rows,
        })
    }

    pub fn frame_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// UV rect `[u0, v0, u1, v1]` of `frame`, v growing downward.
    pub fn frame_uv(&self, frame: u32) -> Option<[f32; 4]> {
        if frame >= self.frame_count() {
            return None;
        }
        let width = self.image_width as f32;
        let height = self.image_height as f32;
        let x = (frame % self.columns * self.frame_width) as f32;
        let y = (frame / self.columns * self.frame_height) as f32;
        Some([
            x / width,
            y / height,
            (x + self.frame_width as f32) / width,
            (y + self.frame_height as f32) / height,
        ])
    }
}

#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub image: RgbaImage,
    pub sheet: Option<SpriteSheet>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: HashMap<String, LoadedAsset>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, key: &str, image: RgbaImage) -> Result<(), String> {
        self.insert(key, LoadedAsset { image, sheet: None })
    }

    pub fn insert_spritesheet(
        &mut self,
        key: &str,
        image: RgbaImage,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<(), String> {
        let sheet = SpriteSheet::slice(image.width(), image.height(), frame_width, frame_height)
            .map_err(|e| format!("Asset '{key}': {e}"))?;
        self.insert(
            key,
            LoadedAsset {
                image,
                sheet: Some(sheet),
            },
        )
    }

    fn insert(&mut self, key: &str, asset: LoadedAsset) -> Result<(), String> {
        if self.assets.contains_key(key) {
            return Err(format!("Duplicate asset key '{key}'"));
        }
        self.assets.insert(key.to_string(), asset);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&LoadedAsset> {
        self.assets.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedAsset)> {
        self.assets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn sheet(&self, key: &str) -> Option<&SpriteSheet> {
        self.assets.get(key)?.sheet.as_ref()
    }

    /// Pixel size of one drawn frame: the frame size for sheets, the whole
    /// image otherwise.
    pub fn size(&self, key: &str) -> Option<Vec2> {
        let asset = self.assets.get(key)?;
        Some(match &asset.sheet {
            Some(sheet) => Vec2::new(sheet.frame_width as f32, sheet.frame_height as f32),
            None => Vec2::new(asset.image.width() as f32, asset.image.height() as f32),
        })
    }

    pub fn require_size(&self, key: &str) -> Result<Vec2, String> {
        self.size(key)
            .ok_or_else(|| format!("Asset '{key}' was not preloaded"))
    }

    /// UV rect for `frame` of `key`; plain images ignore the frame.
    pub fn uv(&self, key: &str, frame: Option<u32>) -> Option<[f32; 4]> {
        match (self.sheet(key), frame) {
            (Some(sheet), Some(frame)) => sheet.frame_uv(frame),
            (Some(sheet), None) => sheet.frame_uv(0),
            (None, _) => self.assets.get(key).map(|_| [0.0, 0.0, 1.0, 1.0]),
        }
    }
}

/// Catalog with blank images at the tutorial's asset sizes.
#[cfg(test)]
pub(crate) fn tutorial_catalog() -> AssetCatalog {
    let mut catalog = AssetCatalog::new();
    let images = [
        (SKY, 800, 600),
        (GROUND, 400, 32),
        (STAR, 24, 22),
        (BOMB, 14, 14),
    ];
    for (key, width, height) in images {
        catalog
            .insert_image(key, RgbaImage::new(width, height))
            .expect("insert image");
    }
    catalog
        .insert_spritesheet(
            DUDE,
            RgbaImage::new(DUDE_FRAME_WIDTH * 9, DUDE_FRAME_HEIGHT),
            DUDE_FRAME_WIDTH,
            DUDE_FRAME_HEIGHT,
        )
        .expect("insert sheet");
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir_path(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "starcatch_assets_test_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
            .save(dir.join(name))
            .expect("write png");
    }

    fn write_full_asset_set(dir: &Path) {
        fs::create_dir_all(dir).expect("create asset dir");
        write_png(dir, "sky.png", 80, 60);
        write_png(dir, "platform.png", 40, 4);
        write_png(dir, "star.png", 24, 22);
        write_png(dir, "bomb.png", 14, 14);
        write_png(dir, "dude.png", 288, 48);
    }

    #[test]
    fn preload_declares_five_assets_in_order() {
        let manifest = preload();
        let keys: Vec<&str> = manifest.decls().iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec![SKY, GROUND, STAR, BOMB, DUDE]);
        assert_eq!(
            manifest.decls()[4].kind,
            AssetKind::SpriteSheet {
                frame_width: 32,
                frame_height: 48
            }
        );
    }

    #[test]
    fn load_decodes_every_asset() {
        let dir = temp_dir_path("load");
        write_full_asset_set(&dir);

        let catalog = preload().load(&dir).expect("catalog should load");
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.size(DUDE), Some(Vec2::new(32.0, 48.0)));
        assert_eq!(catalog.size(STAR), Some(Vec2::new(24.0, 22.0)));
        assert_eq!(catalog.sheet(DUDE).map(SpriteSheet::frame_count), Some(9));
        assert!(catalog.get(BOMB).is_some());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_asset_fails_whole_preload() {
        let dir = temp_dir_path("missing");
        write_full_asset_set(&dir);
        fs::remove_file(dir.join("star.png")).expect("remove star");

        let err = preload().load(&dir).expect_err("missing star must fail");
        assert!(err.contains("Failed to read asset 'star'"), "{err}");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn undecodable_asset_is_rejected() {
        let dir = temp_dir_path("corrupt");
        write_full_asset_set(&dir);
        fs::write(dir.join("bomb.png"), b"not a png").expect("overwrite bomb");

        let err = preload().load(&dir).expect_err("corrupt bomb must fail");
        assert!(err.contains("Failed to decode asset 'bomb'"), "{err}");

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn sheet_smaller_than_a_frame_is_rejected() {
        let mut catalog = AssetCatalog::new();
        let err = catalog
            .insert_spritesheet(DUDE, RgbaImage::new(16, 48), 32, 48)
            .expect_err("too small");
        assert!(err.contains("smaller than one 32x48 frame"), "{err}");
    }

    #[test]
    fn frame_uv_walks_rows_left_to_right() {
        let sheet = SpriteSheet::slice(64, 96, 32, 48).expect("sheet");
        assert_eq!(sheet.frame_count(), 4);
        assert_eq!(sheet.frame_uv(0), Some([0.0, 0.0, 0.5, 0.5]));
        assert_eq!(sheet.frame_uv(1), Some([0.5, 0.0, 1.0, 0.5]));
        assert_eq!(sheet.frame_uv(2), Some([0.0, 0.5, 0.5, 1.0]));
        assert_eq!(sheet.frame_uv(4), None);
    }

    #[test]
    fn frame_uv_uses_full_image_size_for_ragged_sheets() {
        let mut catalog = AssetCatalog::new();
        catalog
            .insert_spritesheet(DUDE, RgbaImage::new(300, 50), 32, 48)
            .expect("ragged sheet");
        let sheet = catalog.sheet(DUDE).expect("sheet");
        assert_eq!(sheet.frame_count(), 9);

        let [u0, v0, u1, v1] = catalog.uv(DUDE, Some(1)).expect("frame 1");
        assert!((u0 - 32.0 / 300.0).abs() < 1e-6, "u0 {u0}");
        assert!((u1 - 64.0 / 300.0).abs() < 1e-6, "u1 {u1}");
        assert_eq!(v0, 0.0);
        assert!((v1 - 48.0 / 50.0).abs() < 1e-6, "v1 {v1}");

        // Frames keep their pixel size, so every frame spans the same UV width.
        let [last_u0, _, last_u1, _] = catalog.uv(DUDE, Some(8)).expect("frame 8");
        assert!((last_u1 - last_u0 - 32.0 / 300.0).abs() < 1e-6);
        assert!((last_u1 - 288.0 / 300.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut catalog = AssetCatalog::new();
        catalog.insert_image(STAR, RgbaImage::new(2, 2)).expect("first");
        assert!(catalog.insert_image(STAR, RgbaImage::new(2, 2)).is_err());
    }

    #[test]
    fn plain_images_use_full_uv() {
        let mut catalog = AssetCatalog::new();
        catalog.insert_image(SKY, RgbaImage::new(8, 6)).expect("sky");
        assert_eq!(catalog.uv(SKY, Some(3)), Some([0.0, 0.0, 1.0, 1.0]));
        assert_eq!(catalog.uv("missing", None), None);
    }
}
