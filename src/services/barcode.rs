// src/services/barcode.rs

use std::future::Future;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use barcoders::sym::ean13::EAN13;
use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::common::error::AppError;

pub const BARCODE_DIGITS: usize = 12;

// Rendering geometry, in pixels.
const MODULE_WIDTH: u32 = 2;
const BAR_HEIGHT: u32 = 80;
const QUIET_ZONE_MODULES: u32 = 10;

/// Twelve independent uniform digits. Leading zeros are kept.
pub fn generate_barcode_number<R: Rng>(rng: &mut R) -> String {
    (0..BARCODE_DIGITS)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Draws numbers until `exists` reports no collision. The check may be a store lookup
/// or a plain set membership test.
pub async fn allocate<R, F, Fut>(rng: &mut R, mut exists: F) -> Result<String, AppError>
where
    R: Rng + Send,
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = Result<bool, AppError>> + Send,
{
    loop {
        let candidate = generate_barcode_number(rng);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        tracing::debug!("barcode number {} collided, drawing again", candidate);
    }
}

/// A generator that can be held across `.await` points.
pub fn barcode_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Produces the scannable image for an item and returns the reference stored on the row.
#[async_trait]
pub trait BarcodeRenderer: Send + Sync {
    async fn render(&self, item_name: &str, barcode_number: &str) -> Result<String, AppError>;

    /// Where the image referenced by `barcode_image` lives, if the renderer keeps files.
    fn locate(&self, barcode_image: &str) -> Option<PathBuf>;
}

/// Writes EAN-13 PNGs named after the item and its number into a directory.
#[derive(Debug, Clone)]
pub struct PngBarcodeRenderer {
    dir: PathBuf,
}

impl PngBarcodeRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// File name for an item's barcode. The barcode number keeps names that sanitise to the
/// same stem apart, and path separators can't escape the barcode directory.
pub fn image_file_name(item_name: &str, barcode_number: &str) -> String {
    let stem: String = item_name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() {
        format!("{barcode_number}.png")
    } else {
        format!("{stem}-{barcode_number}.png")
    }
}

/// EAN-13 modules (check digit appended) drawn as a grayscale PNG.
pub fn render_png(barcode_number: &str) -> Result<Vec<u8>, AppError> {
    let modules = EAN13::new(barcode_number.to_string())
        .map_err(|e| AppError::BarcodeGeneration(e.to_string()))?
        .encode();

    let width = (modules.len() as u32 + 2 * QUIET_ZONE_MODULES) * MODULE_WIDTH;
    let image = GrayImage::from_fn(width, BAR_HEIGHT, |x, _| {
        let module = (x / MODULE_WIDTH).checked_sub(QUIET_ZONE_MODULES);
        let bar = module
            .and_then(|m| modules.get(m as usize))
            .is_some_and(|bit| *bit == 1);
        if bar { Luma([0u8]) } else { Luma([255u8]) }
    });

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| AppError::BarcodeGeneration(e.to_string()))?;
    Ok(png)
}

#[async_trait]
impl BarcodeRenderer for PngBarcodeRenderer {
    async fn render(&self, item_name: &str, barcode_number: &str) -> Result<String, AppError> {
        let code = barcode_number.to_owned();
        let png = tokio::task::spawn_blocking(move || render_png(&code))
            .await
            .map_err(|e| anyhow::anyhow!("barcode rendering task failed: {}", e))??;

        let file_name = image_file_name(item_name, barcode_number);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::BarcodeGeneration(e.to_string()))?;
        tokio::fs::write(self.dir.join(&file_name), png)
            .await
            .map_err(|e| AppError::BarcodeGeneration(e.to_string()))?;

        tracing::debug!("barcode {} written to {}", barcode_number, file_name);
        Ok(file_name)
    }

    fn locate(&self, barcode_image: &str) -> Option<PathBuf> {
        // Only bare file names produced by `image_file_name` are served.
        let path = Path::new(barcode_image);
        match path.file_name() {
            Some(name) if name == path.as_os_str() => Some(self.dir.join(name)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn numbers_are_twelve_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let n = generate_barcode_number(&mut rng);
            assert_eq!(n.len(), BARCODE_DIGITS);
            assert!(n.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn allocate_retries_until_the_check_passes() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut rejected = Vec::new();
        let number = allocate(&mut rng, |candidate| {
            let collides = rejected.len() < 3;
            if collides {
                rejected.push(candidate);
            }
            async move { Ok(collides) }
        })
        .await
        .unwrap();

        assert_eq!(rejected.len(), 3);
        assert!(!rejected.contains(&number));
        assert_eq!(number.len(), BARCODE_DIGITS);
    }

    #[tokio::test]
    async fn allocate_surfaces_a_failing_check() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = allocate(&mut rng, |_| async {
            Err(AppError::BarcodeGeneration("store down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::BarcodeGeneration(_))));
    }

    #[test]
    fn file_names_stay_inside_the_directory() {
        assert_eq!(image_file_name("Fresh Tomato", "012345678901"), "Fresh Tomato-012345678901.png");
        assert_eq!(image_file_name("../../etc/passwd", "1"), "_.._etc_passwd-1.png");
        assert_eq!(image_file_name("   ", "012345678901"), "012345678901.png");
    }

    #[test]
    fn names_that_sanitise_alike_get_distinct_files() {
        let slash = image_file_name("a/b", "111111111111");
        let underscore = image_file_name("a_b", "222222222222");
        assert_ne!(slash, underscore);
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(matches!(render_png("12345abcde12"), Err(AppError::BarcodeGeneration(_))));
    }

    #[tokio::test]
    async fn writes_a_png_named_after_the_item() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PngBarcodeRenderer::new(dir.path());

        let reference = renderer.render("Rice", "012345678901").await.unwrap();

        assert_eq!(reference, "Rice-012345678901.png");
        let bytes = std::fs::read(dir.path().join(&reference)).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(renderer.locate(&reference), Some(dir.path().join(&reference)));
        assert_eq!(renderer.locate("../Rice.png"), None);
    }

    #[tokio::test]
    async fn colliding_stems_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PngBarcodeRenderer::new(dir.path());

        let first = renderer.render("a/b", "111111111111").await.unwrap();
        let first_png = std::fs::read(dir.path().join(&first)).unwrap();
        let second = renderer.render("a_b", "222222222222").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(dir.path().join(&first)).unwrap(), first_png);
        assert_eq!(first_png, render_png("111111111111").unwrap());
    }

    proptest! {
        #[test]
        fn allocated_numbers_never_collide(taken in prop::collection::hash_set("[0-9]{12}", 0..50), seed in any::<u64>()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let taken: HashSet<String> = taken;
            let mut rng = StdRng::seed_from_u64(seed);
            let number = rt
                .block_on(allocate(&mut rng, |candidate| {
                    let hit = taken.contains(&candidate);
                    async move { Ok(hit) }
                }))
                .unwrap();
            prop_assert_eq!(number.len(), BARCODE_DIGITS);
            prop_assert!(number.chars().all(|c| c.is_ascii_digit()));
            prop_assert!(!taken.contains(&number));
        }
    }
}
