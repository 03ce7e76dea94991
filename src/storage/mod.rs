//! On-disk model storage
//!
//! Every model lives as `<models_dir>/<filename>`. In-flight downloads use
//! `<filename>.part` and are never reported as installed.

mod download;

pub use download::{ModelDownloader, CHUNK_SIZE, PROGRESS_INTERVAL};

use crate::catalog::{strip_model_extension, ModelCatalog, MODEL_EXTENSION};
use crate::error::{missing_file, GatewayError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Suffix of a staging file for an in-flight download
pub const PART_SUFFIX: &str = ".part";

/// A model file found in storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstalledModel {
    /// File name without the model extension
    pub name: String,
    pub filename: String,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    pub digest: String,
    /// Whether the engine was last switched to this file
    pub active: bool,
}

/// Resolves model names to files inside the models directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    catalog: Arc<ModelCatalog>,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>, catalog: Arc<ModelCatalog>) -> Self {
        Self {
            dir: dir.into(),
            catalog,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Storage file name for a model name (catalog filename or `<name>.gguf`)
    pub fn filename_for(&self, name: &str) -> String {
        self.catalog.filename_for(name)
    }

    /// Full path a model would occupy, whether or not it exists
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        self.path_in_dir(&self.filename_for(name))
    }

    /// `filename` joined onto the models directory. Names that would
    /// resolve anywhere else (separators, `..`, absolute paths) are
    /// `NotFound`.
    pub fn path_in_dir(&self, filename: &str) -> Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !filename.contains(['/', '\\']) => {
                Ok(self.dir.join(filename))
            }
            _ => Err(GatewayError::not_found(format!(
                "model file '{}' in {}",
                filename,
                self.dir.display()
            ))),
        }
    }

    /// Staging path used while `filename` is downloading
    pub fn part_path(&self, filename: &str) -> PathBuf {
        self.dir.join(format!("{}{}", filename, PART_SUFFIX))
    }

    /// Path of an installed model, or `NotFound` when the file is absent
    pub fn resolve_installed(&self, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(missing_file(name, path))
        }
    }

    /// Scans the directory for model files, sorted by name.
    ///
    /// A missing directory yields an empty list. Nothing is cached.
    pub fn list(&self, active_filename: Option<&str>) -> Result<Vec<InstalledModel>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "Models directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(GatewayError::io_at("read models directory", &self.dir, e)),
        };

        let mut models = Vec::new();
        for entry in entries.flatten() {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.ends_with(MODEL_EXTENSION) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let modified = match metadata.modified() {
                Ok(time) => DateTime::<Utc>::from(time),
                Err(_) => continue,
            };

            let name = strip_model_extension(&filename).to_string();
            models.push(InstalledModel {
                digest: format!("gguf-{}", name),
                active: active_filename == Some(filename.as_str()),
                size_bytes: metadata.len(),
                modified,
                name,
                filename,
            });
        }

        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }

    /// File names of every installed model
    pub fn installed_filenames(&self) -> Result<Vec<String>> {
        Ok(self.list(None)?.into_iter().map(|m| m.filename).collect())
    }

    /// Removes an installed model. Fails with `NotFound` and touches nothing
    /// when the file does not exist.
    pub fn delete(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve_installed(name)?;
        fs::remove_file(&path).map_err(|e| GatewayError::io_at("delete", &path, e))?;
        info!(model = %name, path = %path.display(), "Deleted model");
        Ok(path)
    }

    /// Creates the directory with owner-only permissions if missing
    pub fn ensure_dir(&self) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.dir)
            .map_err(|e| GatewayError::io_at("create models directory", &self.dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &Path) -> ModelStore {
        ModelStore::new(dir, Arc::new(ModelCatalog::builtin()))
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp.path().join("not-yet"));
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("zeta.gguf"), b"zz").unwrap();
        fs::write(temp.path().join("alpha.gguf"), b"a").unwrap();
        fs::write(temp.path().join("beta.gguf.part"), b"partial").unwrap();
        fs::write(temp.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(temp.path().join("dir.gguf")).unwrap();

        let models = store(temp.path()).list(Some("zeta.gguf")).unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert_eq!(models[0].size_bytes, 1);
        assert_eq!(models[0].digest, "gguf-alpha");
        assert!(!models[0].active);
        assert!(models[1].active);
    }

    #[test]
    fn test_resolve_uses_catalog_filename() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path());
        assert_eq!(
            store.path_for("qwen2.5-0.5b").unwrap(),
            temp.path().join("qwen2.5-0.5b-instruct-q4_k_m.gguf")
        );
        assert_eq!(
            store.path_for("custom").unwrap(),
            temp.path().join("custom.gguf")
        );
    }

    #[test]
    fn test_names_cannot_leave_models_dir() {
        let temp = TempDir::new().unwrap();
        let models = temp.path().join("models");
        fs::create_dir(&models).unwrap();
        let outside = temp.path().join("precious.gguf");
        fs::write(&outside, b"keep me").unwrap();
        let store = store(&models);

        for name in ["../precious", "../precious.gguf", "sub/../../precious"] {
            let err = store.delete(name).unwrap_err();
            assert!(err.is_not_found(), "{}: {:?}", name, err);
        }
        let absolute = outside.to_string_lossy().into_owned();
        assert!(store.resolve_installed(&absolute).unwrap_err().is_not_found());
        assert!(store.path_in_dir("a\\b.gguf").is_err());

        assert!(outside.exists());
    }

    #[test]
    fn test_catalog_filename_with_separator_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut escaping = ModelCatalog::builtin().entries()[0].clone();
        escaping.name = "escaping".to_string();
        escaping.filename = "../escaping.gguf".to_string();
        let store = ModelStore::new(
            temp.path(),
            Arc::new(ModelCatalog::new(vec![escaping])),
        );

        assert!(store.path_for("escaping").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_removes_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("custom.gguf"), b"weights").unwrap();

        let store = store(temp.path());
        store.delete("custom").unwrap();
        assert!(!temp.path().join("custom.gguf").exists());
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("keep.gguf"), b"weights").unwrap();

        let store = store(temp.path());
        let before = store.list(None).unwrap();
        let err = store.delete("no-such-model").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.list(None).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = store(&temp.path().join("a").join("models"));
        store.ensure_dir().unwrap();

        let mode = fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
