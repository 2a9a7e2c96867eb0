//! # ut-storage-local
//! unitrade/crates/ut-plugins/ut-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage, directory sharding, and thumbnailing.

use std::io::Cursor;
use std::path::PathBuf;

use anyhow::{bail, Context};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tokio::fs;
use ut_core::traits::MediaStore;

/// Longest edge of generated thumbnails, in pixels.
pub const THUMBNAIL_EDGE: u32 = 250;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Shard directory for a hash: "<root>/ab/cd"
    fn shard_dir(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        if let Some((a, b)) = shard(hash) {
            path.push(a);
            path.push(b);
        }
        path
    }

    fn public_path(&self, file_name: &str, hash: &str) -> String {
        match shard(hash) {
            Some((a, b)) => format!("{}/{a}/{b}/{file_name}", self.url_prefix),
            None => format!("{}/{file_name}", self.url_prefix),
        }
    }
}

/// First two byte-pairs of a hex digest.
fn shard(hash: &str) -> Option<(&str, &str)> {
    Some((hash.get(0..2)?, hash.get(2..4)?))
}

/// The hash part of a media id ("<sha256>.<ext>").
fn stem(media_id: &str) -> &str {
    media_id.split_once('.').map_or(media_id, |(hash, _)| hash)
}

/// Decodes the payload and renders its WebP thumbnail. Returns the file
/// extension of the detected format and the encoded thumbnail.
fn render_thumbnail(data: &[u8]) -> anyhow::Result<(&'static str, Vec<u8>)> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader.format().context("unrecognized image format")?;
    let img = reader.decode().context("payload is not a decodable image")?;

    let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgba8());
    let mut encoded = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut encoded), ImageFormat::WebP)?;

    let ext = format.extensions_str().first().copied().unwrap_or("img");
    Ok((ext, encoded))
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload using its SHA-256 hash as the filename.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        if !content_type.starts_with("image/") {
            bail!("unsupported content type `{content_type}`");
        }
        if data.is_empty() {
            bail!("empty upload");
        }

        // 1. Calculate Hash
        let hash = format!("{:x}", Sha256::digest(&data));

        // 2. Decode and thumbnail off the async workers
        let (data, rendered) = tokio::task::spawn_blocking(move || {
            let rendered = render_thumbnail(&data);
            (data, rendered)
        })
        .await
        .context("thumbnail task panicked")?;
        let (ext, thumbnail) = rendered?;

        let media_id = format!("{hash}.{ext}");
        let dir = self.shard_dir(&hash);
        let target_path = dir.join(&media_id);

        // 3. Save original and thumbnail (if not exists)
        fs::create_dir_all(&dir).await?;
        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;
            fs::write(dir.join(format!("thumb_{hash}.webp")), &thumbnail).await?;
            tracing::debug!(%media_id, bytes = data.len(), "stored upload");
        }

        Ok(media_id)
    }

    fn get_url(&self, media_id: &str) -> String {
        self.public_path(media_id, stem(media_id))
    }

    fn get_thumbnail_url(&self, media_id: &str) -> String {
        let hash = stem(media_id);
        self.public_path(&format!("thumb_{hash}.webp"), hash)
    }
}
