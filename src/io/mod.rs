pub mod csv;

use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::utils;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// File stem for a character's image: lowercase, underscores for whitespace,
/// filesystem-hostile and punctuation characters removed.
pub fn image_slug<S: AsRef<str>>(name: S) -> String {
    let name_ref = name.as_ref().trim();
    if name_ref.is_empty() {
        return "invalid_empty_name".to_string();
    }

    let cleaned = config::FORBIDDEN_CHARS_RE.replace_all(name_ref, "_");
    let cleaned = config::WHITESPACE_RE.replace_all(&cleaned, "_");
    let cleaned: String = cleaned
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_matches('_');

    if cleaned.is_empty() {
        "invalid_or_empty_name".to_string()
    } else {
        cleaned.to_string()
    }
}

pub(crate) fn map_io_error(error: std::io::Error, path: &Path) -> AppError {
    AppError::persistence(path, error.to_string())
}

async fn write_file_async(fpath: &Path, data: &[u8]) -> AppResult<()> {
    let mut file = File::create(fpath)
        .await
        .map_err(|e| map_io_error(e, fpath))?;
    file.write_all(data)
        .await
        .map_err(|e| map_io_error(e, fpath))?;
    file.flush().await.map_err(|e| map_io_error(e, fpath))?;

    Ok(())
}

async fn remove_partial(fpath: &Path) {
    if fs::try_exists(fpath).await.unwrap_or(false) {
        let _ = fs::remove_file(fpath).await;
    }
}

fn partial_path(fpath: &Path) -> PathBuf {
    let mut name = fpath.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    fpath.with_file_name(name)
}

/// Writes image bytes to a `.part` sibling and renames it into place, so an interrupted
/// write never leaves a truncated file under the final name.
pub async fn write_image(fpath: &Path, data: &[u8]) -> AppResult<()> {
    let partial = partial_path(fpath);
    let result = match write_file_async(&partial, data).await {
        Ok(()) => fs::rename(&partial, fpath)
            .await
            .map_err(|e| map_io_error(e, fpath)),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        log(
            LogLevel::Error,
            &format!("Save Image FAIL: {}. File: '{}'", e, fpath.display()),
        );
        remove_partial(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// A previously downloaded `{slug}{ext}` file with a supported image extension.
pub async fn find_existing_image(dir: &Path, slug: &str) -> AppResult<Option<PathBuf>> {
    for ext in config::SUPPORTED_IMAGE_EXTENSIONS {
        let candidate = dir.join(format!("{}{}", slug, ext));
        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => return Ok(Some(candidate)),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(map_io_error(e, &candidate)),
        }
    }
    Ok(None)
}

pub async fn save_json<T>(fpath: PathBuf, data: T, log_ctx: String) -> AppResult<()>
where
    T: Serialize + Send + Sync + 'static,
{
    let json_string =
        utils::run_blocking(move || serde_json::to_string_pretty(&data).map_err(AppError::from))
            .await
            .map_err(|e| {
                log(
                    LogLevel::Error,
                    &format!(
                        "Save JSON ({}) FAIL - Serialize/Task Error: {}. File: '{}'",
                        log_ctx,
                        e,
                        fpath.display()
                    ),
                );
                e
            })?;

    if let Err(e) = write_file_async(&fpath, json_string.as_bytes()).await {
        log(
            LogLevel::Error,
            &format!(
                "Save JSON ({}) FAIL - Write Error: {}. File: '{}'",
                log_ctx,
                e,
                fpath.display()
            ),
        );
        remove_partial(&fpath).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_are_filesystem_safe() {
        assert_eq!(image_slug("Tim Cheese"), "tim_cheese");
        assert_eq!(image_slug("  Tung Tung  Sahur "), "tung_tung_sahur");
        assert_eq!(image_slug("L'Ora (OG) & Co"), "lora_og__co");
        assert_eq!(image_slug("a/b:c"), "a_b_c");
        assert_eq!(image_slug("   "), "invalid_empty_name");
        assert_eq!(image_slug("???"), "invalid_or_empty_name");
    }

    #[tokio::test]
    async fn existing_image_is_found_by_slug() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(find_existing_image(tmp.path(), "tim_cheese").await.unwrap(), None);

        std::fs::write(tmp.path().join("tim_cheese.webp"), b"RIFF").unwrap();
        std::fs::write(tmp.path().join("tim_cheese_old.png"), b"x").unwrap();
        assert_eq!(
            find_existing_image(tmp.path(), "tim_cheese").await.unwrap(),
            Some(tmp.path().join("tim_cheese.webp"))
        );
        assert_eq!(find_existing_image(tmp.path(), "tim").await.unwrap(), None);
    }

    #[tokio::test]
    async fn image_write_leaves_no_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tim_cheese.png");
        write_image(&path, b"\x89PNG data").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG data");
        assert!(!tmp.path().join("tim_cheese.png.part").exists());
    }

    #[tokio::test]
    async fn interrupted_write_is_not_reused() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("tim_cheese.png.part"), b"\x89PN").unwrap();
        assert_eq!(find_existing_image(tmp.path(), "tim_cheese").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_image_write_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing_dir").join("tim_cheese.png");
        assert!(write_image(&path, b"data").await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_json_writes_pretty_output() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");
        save_json(path.clone(), vec![1, 2, 3], "test".into())
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n"));
        assert_eq!(serde_json::from_str::<Vec<i32>>(&text).unwrap(), vec![1, 2, 3]);
    }
}
