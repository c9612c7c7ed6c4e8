// src/ingest/images.rs
//! Embedded-image extraction and row association
//!
//! Each accepted image lands in the photo store under a generated filename
//! and is recorded against the sheet row its anchor points at. Format is
//! resolved from the image bytes, not the media filename; vector metafiles
//! are skipped since a browser cannot render them. A single bad image never
//! aborts the batch.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::heuristics::SKIPPED_IMAGE_FORMATS;
use super::workbook::EmbeddedImage;
use crate::common::generate_raw_id;
use crate::services::PhotoStore;

/// One stored image: public path plus source byte length for conflict checks
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub path: String,
    pub byte_len: usize,
}

/// Sheet row (0-indexed, native workbook coordinates) -> stored image
pub type ImageRowMap = HashMap<u32, StoredImage>;

/// Resolve the true image format from leading bytes, falling back to the
/// workbook's nominal hint when the content is unrecognized
pub fn resolve_format(bytes: &[u8], hint: &str) -> String {
    let info = infer::Infer::new();
    if let Some(kind) = info.get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image {
            return kind.extension().to_string();
        }
    }
    // Normalize the hint so "jpeg" and "jpg" store identically
    match hint {
        "jpeg" => "jpg".to_string(),
        other => other.to_string(),
    }
}

/// Metafiles and other non-browser-renderable formats are skipped
pub fn is_renderable_format(format: &str) -> bool {
    !SKIPPED_IMAGE_FORMATS.contains(&format)
}

/// Larger source image wins a row; equal sizes keep the incumbent
pub fn challenger_wins(existing_len: usize, challenger_len: usize) -> bool {
    challenger_len > existing_len
}

/// Store embedded images and build the row -> path map.
///
/// Per-image failures (unsupported format, write errors, a failed delete of
/// a displaced blob) are logged and swallowed; extraction always returns
/// whatever it managed to store.
pub async fn extract_row_images(images: &[EmbeddedImage], photos: &PhotoStore) -> ImageRowMap {
    let mut map = ImageRowMap::new();

    if images.is_empty() {
        return map;
    }

    if let Err(e) = photos.ensure_dir().await {
        warn!(error = %e, "Failed to create photo storage directory");
    }

    for image in images {
        let format = resolve_format(&image.bytes, &image.format_hint);
        if !is_renderable_format(&format) {
            debug!(row = image.anchor_row, format = %format, "Skipping non-renderable embedded image");
            continue;
        }

        if let Some(current) = map.get(&image.anchor_row) {
            if !challenger_wins(current.byte_len, image.bytes.len()) {
                continue;
            }
            // The displaced image's blob must not linger in storage
            photos.delete(&current.path).await;
        }

        let filename = format!("{}.{}", generate_raw_id(10), format);
        match photos.put(&filename, &image.bytes).await {
            Ok(path) => {
                map.insert(
                    image.anchor_row,
                    StoredImage {
                        path,
                        byte_len: image.bytes.len(),
                    },
                );
            }
            Err(e) => {
                warn!(error = %e, row = image.anchor_row, "Failed to store embedded image");
            }
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
    const GIF_MAGIC: &[u8] = b"GIF89a\x00\x00\x00\x00";

    #[test]
    fn test_content_beats_hint() {
        // PNG bytes with a jpg hint must resolve to png
        assert_eq!(resolve_format(PNG_MAGIC, "jpg"), "png");
        assert_eq!(resolve_format(JPG_MAGIC, "png"), "jpg");
        assert_eq!(resolve_format(GIF_MAGIC, "jpg"), "gif");
    }

    #[test]
    fn test_unrecognized_content_keeps_hint() {
        assert_eq!(resolve_format(b"\x01\x02\x03\x04nothing", "emf"), "emf");
        assert_eq!(resolve_format(b"", "jpeg"), "jpg");
    }

    #[test]
    fn test_metafiles_are_not_renderable() {
        assert!(!is_renderable_format("emf"));
        assert!(!is_renderable_format("wmf"));
        assert!(!is_renderable_format("x-emf"));
        assert!(is_renderable_format("png"));
        assert!(is_renderable_format("jpg"));
        assert!(is_renderable_format("gif"));
    }

    #[test]
    fn test_conflict_larger_wins_ties_keep_incumbent() {
        assert!(challenger_wins(500, 2000));
        assert!(!challenger_wins(2000, 500));
        assert!(!challenger_wins(1000, 1000));
    }

    fn temp_store() -> PhotoStore {
        let dir = std::env::temp_dir().join(format!("ingest-img-test-{}", generate_raw_id(8)));
        PhotoStore::new(dir)
    }

    fn png_image(anchor_row: u32, payload_len: usize) -> EmbeddedImage {
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.resize(PNG_MAGIC.len() + payload_len, 0xAB);
        EmbeddedImage {
            bytes,
            format_hint: "png".to_string(),
            anchor_row,
        }
    }

    #[tokio::test]
    async fn test_same_row_conflict_keeps_larger_and_deletes_smaller() {
        let store = temp_store();
        let images = vec![png_image(3, 500), png_image(3, 2000)];

        let map = extract_row_images(&images, &store).await;

        assert_eq!(map.len(), 1);
        let kept = map.get(&3).unwrap();
        assert_eq!(kept.byte_len, PNG_MAGIC.len() + 2000);

        // Only the winner's blob remains in the sink
        let mut entries = std::fs::read_dir(store.base_dir()).unwrap();
        let only = entries.next().unwrap().unwrap();
        assert!(entries.next().is_none());
        assert_eq!(
            only.metadata().unwrap().len() as usize,
            PNG_MAGIC.len() + 2000
        );

        std::fs::remove_dir_all(store.base_dir()).unwrap();
    }

    #[tokio::test]
    async fn test_smaller_challenger_never_stored() {
        let store = temp_store();
        let images = vec![png_image(5, 2000), png_image(5, 500)];

        let map = extract_row_images(&images, &store).await;

        assert_eq!(map.get(&5).unwrap().byte_len, PNG_MAGIC.len() + 2000);
        assert_eq!(std::fs::read_dir(store.base_dir()).unwrap().count(), 1);

        std::fs::remove_dir_all(store.base_dir()).unwrap();
    }

    #[tokio::test]
    async fn test_metafile_entry_skipped_silently() {
        let store = temp_store();
        let images = vec![
            EmbeddedImage {
                bytes: vec![0x01, 0x00, 0x00, 0x00],
                format_hint: "emf".to_string(),
                anchor_row: 2,
            },
            png_image(4, 100),
        ];

        let map = extract_row_images(&images, &store).await;

        assert!(map.get(&2).is_none());
        assert!(map.get(&4).is_some());

        std::fs::remove_dir_all(store.base_dir()).unwrap();
    }

    #[tokio::test]
    async fn test_stored_extension_follows_content() {
        let store = temp_store();
        let mut image = png_image(0, 64);
        image.format_hint = "jpg".to_string();

        let map = extract_row_images(&[image], &store).await;

        assert!(map.get(&0).unwrap().path.ends_with(".png"));

        std::fs::remove_dir_all(store.base_dir()).unwrap();
    }
}
