use crate::api::client::WikiClient;
use crate::api::fetchers::fetch_image;
use crate::config::{self, BuilderConfig};
use crate::error::{AppError, AppResult};
use crate::io;
use crate::logging::{log, LogLevel};
use crate::transform::scoring::ScoredCandidate;
use crate::transform::util::{original_image_url, url_image_extension};
use crate::utils::run_cpu_intensive;
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub path: PathBuf,
    pub source_url: String,
    /// Already on disk; nothing was fetched.
    pub reused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: Option<ImageFormat>,
    pub width: u32,
    pub height: u32,
}

fn is_supported_format(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    )
}

/// Sniffs the format from the bytes. With `validate` the format must be one we keep and the
/// dimensions must pass the minimum size and aspect ratio bounds.
pub fn inspect_image(data: &[u8], validate: bool) -> AppResult<ImageInfo> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader.format();
    if !validate {
        return Ok(ImageInfo {
            format,
            width: 0,
            height: 0,
        });
    }

    match format {
        Some(f) if is_supported_format(f) => {}
        Some(f) => return Err(AppError::Image(format!("Unsupported image format {:?}", f))),
        None => return Err(AppError::Image("Unrecognized image data".into())),
    }

    let (width, height) = reader.into_dimensions()?;
    if width < config::MIN_IMAGE_DIMENSION || height < config::MIN_IMAGE_DIMENSION {
        return Err(AppError::Image(format!(
            "Image too small: {}x{} (minimum {}px)",
            width,
            height,
            config::MIN_IMAGE_DIMENSION
        )));
    }
    let aspect = width as f64 / height as f64;
    if !(config::MIN_ASPECT_RATIO..=config::MAX_ASPECT_RATIO).contains(&aspect) {
        return Err(AppError::Image(format!(
            "Unusual aspect ratio {:.2} ({}x{})",
            aspect, width, height
        )));
    }
    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some(".png"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}

fn extension_from_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some(".png"),
        ImageFormat::Jpeg => Some(".jpg"),
        ImageFormat::Gif => Some(".gif"),
        ImageFormat::WebP => Some(".webp"),
        _ => None,
    }
}

/// Content type first, then the URL, then the sniffed format; `.png` when all are silent.
pub fn choose_extension(
    content_type: Option<&str>,
    url: &str,
    format: Option<ImageFormat>,
) -> &'static str {
    content_type
        .and_then(extension_from_content_type)
        .or_else(|| {
            url_image_extension(url).filter(|ext| config::SUPPORTED_IMAGE_EXTENSIONS.contains(ext))
        })
        .or_else(|| format.and_then(extension_from_format))
        .unwrap_or(".png")
}

#[derive(Clone)]
pub struct ImageDownloader {
    client: WikiClient,
    images_dir: PathBuf,
    skip_existing: bool,
    validate: bool,
    max_candidates: usize,
}

impl ImageDownloader {
    pub fn new(client: WikiClient, config: &BuilderConfig) -> Self {
        Self {
            client,
            images_dir: config.images_dir.clone(),
            skip_existing: config.skip_existing_images,
            validate: config.validate_images,
            max_candidates: config.max_image_candidates.max(1),
        }
    }

    async fn fetch_body(&self, url: &str) -> AppResult<(String, Option<String>, Bytes)> {
        let original = original_image_url(url);
        let resp = match fetch_image(&self.client, &original).await {
            Ok(resp) => resp,
            Err(e) if original != url && !matches!(e, AppError::Cancelled(_)) => {
                log(
                    LogLevel::Debug,
                    &format!("Original image fetch failed ({}), retrying thumbnail URL", e),
                );
                fetch_image(&self.client, url).await?
            }
            Err(e) => return Err(e),
        };
        if resp.body.len() > config::MAX_IMAGE_BYTES {
            return Err(AppError::Image(format!(
                "Image larger than {} bytes: {}",
                config::MAX_IMAGE_BYTES,
                original
            )));
        }
        Ok((resp.final_url, resp.content_type, resp.body))
    }

    /// Downloads one image to `{slug}{ext}` in the images directory.
    pub async fn download(&self, name: &str, url: &str) -> AppResult<DownloadedImage> {
        let slug = io::image_slug(name);
        if self.skip_existing {
            if let Some(path) = io::find_existing_image(&self.images_dir, &slug).await? {
                log(
                    LogLevel::Debug,
                    &format!("Reusing existing image for '{}': {}", name, path.display()),
                );
                return Ok(DownloadedImage {
                    path,
                    source_url: url.to_string(),
                    reused: true,
                });
            }
        }

        let (final_url, content_type, body) = self.fetch_body(url).await?;
        let validate = self.validate;
        let inspected = body.clone();
        let info = run_cpu_intensive(move || inspect_image(&inspected, validate)).await??;

        let ext = choose_extension(content_type.as_deref(), &final_url, info.format);
        let path = self.images_dir.join(format!("{}{}", slug, ext));
        io::write_image(&path, &body).await?;
        Ok(DownloadedImage {
            path,
            source_url: final_url,
            reused: false,
        })
    }

    /// Tries ranked candidates best first, at most `max_image_candidates` of them.
    pub async fn download_best(
        &self,
        name: &str,
        ranked: &[ScoredCandidate],
    ) -> AppResult<DownloadedImage> {
        let mut last_error = AppError::Image(format!("No image candidates for '{}'", name));
        for scored in ranked.iter().take(self.max_candidates) {
            match self.download(name, &scored.candidate.url).await {
                Ok(image) => return Ok(image),
                Err(e @ AppError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    log(
                        LogLevel::Debug,
                        &format!(
                            "Image candidate {} for '{}' rejected: {}",
                            scored.candidate.url, name, e
                        ),
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
