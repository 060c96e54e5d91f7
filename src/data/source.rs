// ============================================================
// Layer 4 — QuickDraw Bitmap Source
// ============================================================
// Downloads one .npy archive per category from the public
// QuickDraw bucket, writes it to a local cache directory, then
// parses it from disk.
//
//   https://storage.googleapis.com/quickdraw_dataset/full/numpy_bitmap/{category}.npy
//       │
//       ▼
//   {cache_dir}/{category}.npy      (reused on later runs)
//       │
//       ▼
//   npy::parse_bitmaps              → BitmapArray (28x28 u8 each)
//
// Any network or parse failure is returned to the caller as-is;
// there is no retry.
//
// Reference: ureq crate documentation

use anyhow::{Context, Result};
use std::{fs, io::Read, path::PathBuf};

use crate::data::npy::parse_bitmaps;
use crate::domain::category::Category;
use crate::domain::sample::{BitmapArray, SOURCE_SIZE};
use crate::domain::traits::BitmapSource;

pub const QUICKDRAW_BASE_URL: &str =
    "https://storage.googleapis.com/quickdraw_dataset/full/numpy_bitmap";

/// Fetches QuickDraw bitmaps over HTTP with an on-disk cache.
pub struct QuickDrawSource {
    base_url:  String,
    cache_dir: PathBuf,
}

impl QuickDrawSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_base_url(QUICKDRAW_BASE_URL, cache_dir)
    }

    pub fn with_base_url(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url:  base_url.into().trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Where the archive for `category` is cached.
    pub fn cache_path(&self, category: Category) -> PathBuf {
        self.cache_dir.join(format!("{}.npy", category.name()))
    }

    pub fn url(&self, category: Category) -> String {
        format!("{}/{}.npy", self.base_url, category.name())
    }

    /// Download the archive into the cache unless it is already there.
    fn ensure_cached(&self, category: Category) -> Result<PathBuf> {
        let path = self.cache_path(category);
        if path.exists() {
            tracing::debug!("Using cached {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Cannot create cache dir '{}'", self.cache_dir.display()))?;

        let url = self.url(category);
        tracing::info!("Downloading {}", url);

        let response = ureq::get(&url)
            .call()
            .with_context(|| format!("Request for '{url}' failed"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .with_context(|| format!("Cannot read response body from '{url}'"))?;

        // The cache only ever holds complete archives
        let partial = path.with_extension("npy.part");
        fs::write(&partial, &bytes)
            .with_context(|| format!("Cannot write '{}'", partial.display()))?;
        fs::rename(&partial, &path)
            .with_context(|| format!("Cannot move download into '{}'", path.display()))?;

        tracing::debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

impl BitmapSource for QuickDrawSource {
    fn fetch(&self, category: Category) -> Result<BitmapArray> {
        let path  = self.ensure_cached(category)?;
        let bytes = fs::read(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;

        parse_bitmaps(&bytes, SOURCE_SIZE)
            .with_context(|| format!("Cannot parse '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::npy::encode_bitmaps;
    use crate::domain::sample::SOURCE_PIXELS;

    #[test]
    fn test_url_follows_bucket_naming() {
        let src = QuickDrawSource::with_base_url("http://example.test/bitmaps/", "cache");
        assert_eq!(src.url(Category::Star), "http://example.test/bitmaps/star.npy");
    }

    #[test]
    fn test_fetch_reads_cached_archive_without_network() {
        let dir = tempfile::tempdir().unwrap();
        // Unroutable base URL: the test fails if a download is attempted
        let src = QuickDrawSource::with_base_url("http://127.0.0.1:9", dir.path());

        let arr = BitmapArray::new(vec![9u8; SOURCE_PIXELS * 5], SOURCE_SIZE).unwrap();
        fs::write(src.cache_path(Category::Circle), encode_bitmaps(&arr)).unwrap();

        let fetched = src.fetch(Category::Circle).unwrap();
        assert_eq!(fetched.len(), 5);
        assert_eq!(fetched.get(4).unwrap()[0], 9);
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let src = QuickDrawSource::with_base_url("http://127.0.0.1:9", dir.path());
        fs::write(src.cache_path(Category::Square), b"garbage").unwrap();

        assert!(src.fetch(Category::Square).is_err());
    }
}
