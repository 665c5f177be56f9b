use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::detector_backend::DetectorBackend;
use crate::shared::constants::{BLAZEFACE_MODEL_NAME, YOLO_MODEL_NAME, YOLO_MODEL_URL};

const APP_DIR: &str = "FaceBlur";

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("model {name} not found in {searched} and has no download source")]
    NotFound { name: String, searched: String },
}

/// Where a model file can be found or fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSource {
    pub name: &'static str,
    pub url: Option<&'static str>,
}

impl ModelSource {
    pub fn for_backend(backend: DetectorBackend) -> Self {
        match backend {
            DetectorBackend::Geometric => Self {
                name: BLAZEFACE_MODEL_NAME,
                url: None,
            },
            DetectorBackend::DeepModel => Self {
                name: YOLO_MODEL_NAME,
                url: Some(YOLO_MODEL_URL),
            },
        }
    }
}

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled directory, if given
/// 3. Download from the source URL into the cache
pub fn resolve(
    source: &ModelSource,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let cache_dir = model_cache_dir()?;
    resolve_in(source, &cache_dir, bundled_dir)
}

fn resolve_in(
    source: &ModelSource,
    cache_dir: &Path,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(found) = locate(source.name, cache_dir, bundled_dir) {
        log::debug!("Using model {}", found.display());
        return Ok(found);
    }

    let Some(url) = source.url else {
        let mut searched = cache_dir.display().to_string();
        if let Some(dir) = bundled_dir {
            searched.push_str(&format!(", {}", dir.display()));
        }
        return Err(ModelResolveError::NotFound {
            name: source.name.to_string(),
            searched,
        });
    };

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    let cached_path = cache_dir.join(source.name);
    log::info!("Downloading {} from {url}", source.name);
    download(url, &cached_path)?;
    Ok(cached_path)
}

/// First existing `name` in the cache directory, then the bundled directory.
fn locate(name: &str, cache_dir: &Path, bundled_dir: Option<&Path>) -> Option<PathBuf> {
    std::iter::once(cache_dir)
        .chain(bundled_dir)
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceBlur/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceBlur/models/` or `~/.cache/FaceBlur/models/`
/// - Windows: `%LOCALAPPDATA%/FaceBlur/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams `url` into `<dest>.part`, then renames it into place.
fn download(url: &str, dest: &Path) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(url: &str, dest: &Path, temp_path: &Path) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut last_logged_pct = 0;

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if total > 0 {
            let pct = downloaded * 100 / total;
            if pct >= last_logged_pct + 10 {
                last_logged_pct = pct;
                log::debug!("Downloaded {downloaded}/{total} bytes ({pct}%)");
            }
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    log::info!("Saved model to {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCAL_ONLY: ModelSource = ModelSource {
        name: "test_model.onnx",
        url: None,
    };

    #[test]
    fn test_resolve_prefers_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("test_model.onnx"), b"cached").unwrap();
        fs::write(bundled.join("test_model.onnx"), b"bundled").unwrap();

        let path = resolve_in(&LOCAL_ONLY, &cache, Some(&bundled)).unwrap();
        assert_eq!(path, cache.join("test_model.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("test_model.onnx"), b"bundled").unwrap();

        let path = resolve_in(&LOCAL_ONLY, &tmp.path().join("cache"), Some(&bundled)).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"bundled");
    }

    #[test]
    fn test_resolve_without_url_reports_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_in(&LOCAL_ONLY, tmp.path(), None).unwrap_err();
        assert!(matches!(err, ModelResolveError::NotFound { .. }));
        assert!(err.to_string().contains("test_model.onnx"));
    }

    #[test]
    fn test_locate_ignores_directories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("test_model.onnx")).unwrap();
        assert!(locate("test_model.onnx", tmp.path(), None).is_none());
    }

    #[test]
    fn test_model_sources_per_backend() {
        assert!(ModelSource::for_backend(DetectorBackend::Geometric).url.is_none());
        let deep = ModelSource::for_backend(DetectorBackend::DeepModel);
        assert_eq!(deep.name, YOLO_MODEL_NAME);
        assert!(deep.url.is_some());
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_download_invalid_url_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
