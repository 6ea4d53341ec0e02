//! Has the image model redraw the base characters acting out a scene.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose;
use chrono::Local;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::constants::{IMAGE_MODEL, IMAGE_SIZE};
use crate::error::WordImageError;
use crate::openai::{GenerativeApi, ImageEditRequest, ImagePayload, ImageUsage};

/// A generated image saved to disk.
#[derive(Clone, Debug)]
pub struct SavedImage {
    /// Where the PNG was written
    pub path: PathBuf,
    /// Image call usage
    pub usage: ImageUsage,
}

/// Metadata read back from an image file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// File path
    pub path: PathBuf,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format, eg `Png`
    pub format: String,
    /// Size on disk in bytes
    pub file_size: u64,
}

/// Edits the base character image per `prompt` and saves the result in `image_dir`.
pub async fn request_illustration<A: GenerativeApi>(
    api: &A,
    word_stem: &str,
    prompt: &str,
    config: &GenerationConfig,
    image_dir: &Path,
) -> Result<SavedImage, WordImageError> {
    info!(
        "Generating illustration for {word_stem:?} at {} quality",
        config.quality
    );
    debug!("Illustration prompt: {prompt}");

    let base_image = tokio::fs::read(&config.base_image).await.map_err(|err| {
        WordImageError::FileIo(format!(
            "Failed to read base image {}: {err}",
            config.base_image.display()
        ))
    })?;
    let image_name = config
        .base_image
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.png");

    let edit = api
        .edit_image(&ImageEditRequest {
            model: IMAGE_MODEL,
            image: &base_image,
            image_name,
            prompt,
            size: IMAGE_SIZE,
            quality: config.quality,
        })
        .await?;

    let bytes = match edit.payload {
        ImagePayload::Base64(b64) => general_purpose::STANDARD.decode(b64.trim())?,
        ImagePayload::Url(url) => {
            debug!("Image returned by URL, downloading {url}");
            api.download_image(&url).await?
        }
    };

    let (path, mut file) = create_unique_image(image_dir, word_stem).await?;
    let written: std::io::Result<()> = async {
        file.write_all(&bytes).await?;
        file.flush().await
    }
    .await;
    if let Err(err) = written {
        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(&path).await {
            debug!("Couldn't remove partial image {}: {cleanup}", path.display());
        }
        return Err(WordImageError::FileIo(format!(
            "Failed to write {}: {err}",
            path.display()
        )));
    }
    info!("Saved illustration to {}", path.display());

    Ok(SavedImage {
        path,
        usage: edit.usage,
    })
}

/// Creates `{word}_{timestamp}.png`, or the first free `{word}_{timestamp}_{n}.png`.
///
/// The name is claimed with `create_new`, so concurrent callers never share a file.
async fn create_unique_image(
    image_dir: &Path,
    word_stem: &str,
) -> Result<(PathBuf, tokio::fs::File), WordImageError> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut counter = 0u32;
    loop {
        let name = match counter {
            0 => format!("{word_stem}_{timestamp}.png"),
            n => format!("{word_stem}_{timestamp}_{n}.png"),
        };
        let path = image_dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(err) => {
                return Err(WordImageError::FileIo(format!(
                    "Failed to create {}: {err}",
                    path.display()
                )));
            }
        }
    }
}

/// Reads dimensions and format of an image file.
pub fn image_info(path: &Path) -> Result<ImageInfo, WordImageError> {
    let file_size = std::fs::metadata(path)?.len();
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .map(|format| format!("{format:?}"))
        .unwrap_or_else(|| "unknown".to_string());
    let (width, height) = reader.into_dimensions()?;
    Ok(ImageInfo {
        path: path.to_path_buf(),
        width,
        height,
        format,
        file_size,
    })
}
