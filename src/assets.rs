//! Enemy sprite images.
//!
//! Sprites come from `<dir>/<kind>.png`. Any kind whose file is missing or
//! unreadable gets a procedurally drawn placeholder instead.

use combat::EnemyKind;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{debug, warn};

/// Sprites are normalised to this edge length
pub const SPRITE_SIZE: u32 = 64;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("sprite directory not found: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to load sprite {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Where sprite images come from
pub trait SpriteProvider {
    fn load(&self, kind: EnemyKind) -> Result<RgbaImage, AssetError>;
}

/// Reads `<dir>/<kind>.png`, e.g. `assets/enemies/orc.png`
#[derive(Debug, Clone)]
pub struct DirectorySpriteProvider {
    dir: PathBuf,
}

impl DirectorySpriteProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, kind: EnemyKind) -> PathBuf {
        self.dir.join(format!("{kind}.png"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SpriteProvider for DirectorySpriteProvider {
    fn load(&self, kind: EnemyKind) -> Result<RgbaImage, AssetError> {
        if !self.dir.is_dir() {
            return Err(AssetError::MissingDirectory(self.dir.clone()));
        }
        let path = self.path_for(kind);
        let img = image::open(&path).map_err(|source| AssetError::Image {
            path: path.clone(),
            source,
        })?;
        Ok(img
            .resize_exact(SPRITE_SIZE, SPRITE_SIZE, FilterType::Nearest)
            .to_rgba8())
    }
}

/// One sprite per enemy kind
#[derive(Debug, Clone)]
pub struct SpriteRepository {
    sprites: HashMap<EnemyKind, RgbaImage>,
}

impl SpriteRepository {
    /// Load every kind, substituting a placeholder for each failure
    pub fn load(provider: &dyn SpriteProvider) -> Self {
        let mut sprites = HashMap::new();
        for kind in EnemyKind::iter() {
            let sprite = match provider.load(kind) {
                Ok(img) => {
                    debug!(%kind, "sprite loaded");
                    img
                }
                Err(err) => {
                    warn!(%kind, %err, "using placeholder sprite");
                    placeholder(kind)
                }
            };
            sprites.insert(kind, sprite);
        }
        Self { sprites }
    }

    pub fn placeholders() -> Self {
        Self {
            sprites: EnemyKind::iter().map(|k| (k, placeholder(k))).collect(),
        }
    }

    pub fn get(&self, kind: EnemyKind) -> Option<&RgbaImage> {
        self.sprites.get(&kind)
    }

    /// Look up by kind name; unknown names fall back to the goblin sprite.
    pub fn get_by_name(&self, name: &str) -> Option<&RgbaImage> {
        let kind = name.parse::<EnemyKind>().unwrap_or(EnemyKind::Goblin);
        self.get(kind)
    }
}

/// 占位精灵：身体、头、眼睛、脚
struct Palette {
    body: [u8; 3],
    head: [u8; 3],
    eyes: [u8; 3],
    feet: [u8; 3],
    body_center: (f32, f32),
    body_radius: f32,
    head_center: (f32, f32),
    head_radius: f32,
    eye_y: f32,
    eye_radius: f32,
}

fn palette(kind: EnemyKind) -> Palette {
    match kind {
        EnemyKind::Orc => Palette {
            body: [100, 150, 50],
            head: [80, 120, 40],
            eyes: [255, 0, 0],
            feet: [60, 90, 30],
            body_center: (32.0, 50.0),
            body_radius: 24.0,
            head_center: (32.0, 30.0),
            head_radius: 16.0,
            eye_y: 26.0,
            eye_radius: 4.0,
        },
        EnemyKind::Skeleton => Palette {
            body: [240, 240, 240],
            head: [220, 220, 220],
            eyes: [0, 0, 0],
            feet: [200, 200, 200],
            body_center: (32.0, 50.0),
            body_radius: 24.0,
            head_center: (32.0, 30.0),
            head_radius: 16.0,
            eye_y: 26.0,
            eye_radius: 4.0,
        },
        EnemyKind::Goblin => Palette {
            body: [200, 0, 0],
            head: [150, 0, 0],
            eyes: [255, 255, 0],
            feet: [120, 0, 0],
            body_center: (32.0, 50.0),
            body_radius: 20.0,
            head_center: (32.0, 30.0),
            head_radius: 14.0,
            eye_y: 26.0,
            eye_radius: 3.0,
        },
        EnemyKind::Troll => Palette {
            body: [139, 69, 19],
            head: [101, 67, 33],
            eyes: [255, 0, 0],
            feet: [85, 53, 15],
            body_center: (32.0, 48.0),
            body_radius: 28.0,
            head_center: (32.0, 28.0),
            head_radius: 18.0,
            eye_y: 24.0,
            eye_radius: 5.0,
        },
    }
}

fn fill_ellipse(img: &mut RgbaImage, center: (f32, f32), radii: (f32, f32), color: [u8; 3]) {
    let (cx, cy) = center;
    let (rx, ry) = radii;
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let pixel = Rgba([color[0], color[1], color[2], 255]);
    for (x, y, p) in img.enumerate_pixels_mut() {
        let dx = (x as f32 + 0.5 - cx) / rx;
        let dy = (y as f32 + 0.5 - cy) / ry;
        if dx * dx + dy * dy <= 1.0 {
            *p = pixel;
        }
    }
}

/// Draw the stand-in sprite for a kind
pub fn placeholder(kind: EnemyKind) -> RgbaImage {
    let p = palette(kind);
    let mut img = RgbaImage::new(SPRITE_SIZE, SPRITE_SIZE);
    let (bx, by) = p.body_center;
    let feet_y = (by + p.body_radius - 2.0).min(SPRITE_SIZE as f32 - 5.0);
    fill_ellipse(&mut img, (bx - 10.0, feet_y), (8.0, 4.0), p.feet);
    fill_ellipse(&mut img, (bx + 10.0, feet_y), (8.0, 4.0), p.feet);
    fill_ellipse(&mut img, p.body_center, (p.body_radius, p.body_radius), p.body);
    fill_ellipse(&mut img, p.head_center, (p.head_radius, p.head_radius), p.head);
    let (hx, _) = p.head_center;
    for eye_x in [hx - 6.0, hx + 6.0] {
        fill_ellipse(&mut img, (eye_x, p.eye_y), (p.eye_radius, p.eye_radius), p.eyes);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};

    struct Failing;

    impl SpriteProvider for Failing {
        fn load(&self, _kind: EnemyKind) -> Result<RgbaImage, AssetError> {
            Err(AssetError::MissingDirectory(PathBuf::from("nowhere")))
        }
    }

    #[test]
    fn placeholders_cover_every_kind() {
        let repo = SpriteRepository::load(&Failing);
        for kind in EnemyKind::iter() {
            let sprite = repo.get(kind).unwrap();
            assert_eq!(sprite.dimensions(), (SPRITE_SIZE, SPRITE_SIZE));
        }
    }

    #[test]
    fn placeholder_colours_match_kind() {
        let orc = placeholder(EnemyKind::Orc);
        // 身体中心
        assert_eq!(orc.get_pixel(32, 52).0, [100, 150, 50, 255]);
        // 眼睛
        assert_eq!(orc.get_pixel(26, 26).0, [255, 0, 0, 255]);
        // 角落透明
        assert_eq!(orc.get_pixel(0, 0).0[3], 0);
        let troll = placeholder(EnemyKind::Troll);
        assert_eq!(troll.get_pixel(32, 50).0, [139, 69, 19, 255]);
    }

    #[test]
    fn unknown_name_falls_back() {
        let repo = SpriteRepository::placeholders();
        assert_eq!(repo.get_by_name("dragon"), repo.get(EnemyKind::Goblin));
        assert_eq!(repo.get_by_name("troll"), repo.get(EnemyKind::Troll));
    }

    #[test]
    fn directory_sprites_are_resized() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 32, Rgba([9, 8, 7, 255])));
        img.save_with_format(dir.path().join("skeleton.png"), ImageFormat::Png)
            .unwrap();

        let provider = DirectorySpriteProvider::new(dir.path());
        let loaded = provider.load(EnemyKind::Skeleton).unwrap();
        assert_eq!(loaded.dimensions(), (64, 64));
        assert_eq!(loaded.get_pixel(40, 40).0, [9, 8, 7, 255]);

        // 缺失的种类退回占位图
        let repo = SpriteRepository::load(&provider);
        assert_eq!(repo.get(EnemyKind::Orc), Some(&placeholder(EnemyKind::Orc)));
        assert_eq!(repo.get(EnemyKind::Skeleton), Some(&loaded));
    }

    #[test]
    fn missing_directory_is_reported() {
        let provider = DirectorySpriteProvider::new("/definitely/not/here");
        assert!(matches!(
            provider.load(EnemyKind::Orc),
            Err(AssetError::MissingDirectory(_))
        ));
    }
}
