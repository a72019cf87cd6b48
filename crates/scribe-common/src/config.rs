//! Composer configuration: upload limits and asset store options.

use miette::Result;
use miette::miette;
use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

/// Hard ceiling on accepted image size, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: u64 = 5_242_880;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Options forwarded to the asset store on every upload.
    pub store: StoreOptions,
    /// Candidate validation limits.
    pub limits: UploadLimits,
}

/// Options the asset store gateway receives alongside each upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Bucket or container the blobs land in.
    pub bucket: String,
    /// Cache-control max-age the store should serve blobs with.
    pub cache_control_secs: u32,
    /// Whether an upload may replace an existing object under the same key.
    pub overwrite: bool,
}

/// Validation limits applied before any upload starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadLimits {
    /// Maximum accepted file size in bytes.
    pub max_size_bytes: u64,
    /// Required MIME type prefix.
    pub accept_mime_prefix: String,
}

impl ComposerConfig {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader
            .load()
            .await
            .map_err(|_| miette!("Failed to load configuration"))
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver
            .save(self)
            .await
            .map_err(|_| miette!("Failed to save configuration"))
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            bucket: "blog-images".to_owned(),
            cache_control_secs: 3600,
            overwrite: false,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_IMAGE_BYTES,
            accept_mime_prefix: "image/".to_owned(),
        }
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<
            ComposerConfig,
            Box<dyn std::error::Error + Send + Sync + 'static>,
        >,
    > + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(
        &self,
        config: &ComposerConfig,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// An implementation of [`Loader`] and [`Saver`] backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] reading and writing the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Loader for FileStore {
    async fn load(
        &self,
    ) -> core::result::Result<ComposerConfig, Box<dyn std::error::Error + Send + Sync + 'static>>
    {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config = serde_json::from_str(&std::fs::read_to_string(&self.path)?)?;
                tracing::debug!(path = %self.path.display(), "loaded composer config");
                Ok(config)
            }
            _ => Err(miette!("Unsupported file format").into()),
        }
    }
}

impl Saver for FileStore {
    async fn save(
        &self,
        config: &ComposerConfig,
    ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            _ => Err(miette!("Unsupported file format").into()),
        }
    }
}
