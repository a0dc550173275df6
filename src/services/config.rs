use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full project configuration, stored at `.photo-insight/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub classifier: ClassifierConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite catalog, relative to the project root.
    pub metadata_path: String,
    /// LanceDB directory, relative to the project root.
    pub vector_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            metadata_path: ".photo-insight/catalog.db".to_string(),
            vector_path: ".photo-insight/vectors.lance".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            model: "clip-vit-base-patch32".to_string(),
            dimensions: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            model: "qwen2.5-vl-7b".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Largest image edge sent to a model endpoint.
    pub max_image_dimension: u32,
    /// Pacing delay between pipeline items, in milliseconds.
    pub pace_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 1024,
            pace_ms: 50,
        }
    }
}

/// Service for configuration management
pub struct ConfigService {
    project_root: PathBuf,
    config_path: PathBuf,
}

impl ConfigService {
    /// Create a new config service
    pub fn new(project_root: &Path) -> Self {
        let config_path = project_root.join(".photo-insight").join("config.toml");
        Self {
            project_root: project_root.to_path_buf(),
            config_path,
        }
    }

    /// Initialize configuration with defaults
    pub fn init(&self) -> Result<ProjectConfig> {
        let config = ProjectConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<ProjectConfig> {
        let content =
            std::fs::read_to_string(&self.config_path).context("Failed to read config file")?;
        let config: ProjectConfig =
            toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &ProjectConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Resolve a configured relative path against the project root.
    pub fn resolve_path(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Get a configuration value
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        match key {
            "storage.metadata_path" => Ok(config.storage.metadata_path),
            "storage.vector_path" => Ok(config.storage.vector_path),
            "embedding.base_url" => Ok(config.embedding.base_url),
            "embedding.model" => Ok(config.embedding.model),
            "embedding.dimensions" => Ok(config.embedding.dimensions.to_string()),
            "classifier.base_url" => Ok(config.classifier.base_url),
            "classifier.model" => Ok(config.classifier.model),
            "classifier.timeout_secs" => Ok(config.classifier.timeout_secs.to_string()),
            "scan.max_image_dimension" => Ok(config.scan.max_image_dimension.to_string()),
            "scan.pace_ms" => Ok(config.scan.pace_ms.to_string()),
            _ => Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
    }

    /// Set a configuration value
    pub fn set(&self, key: &str, value: String) -> Result<()> {
        let mut config = self.load()?;
        match key {
            "storage.metadata_path" => config.storage.metadata_path = value,
            "storage.vector_path" => config.storage.vector_path = value,
            "embedding.base_url" => config.embedding.base_url = value,
            "embedding.model" => config.embedding.model = value,
            "embedding.dimensions" => {
                config.embedding.dimensions =
                    value.parse().context("dimensions must be an integer")?
            },
            "classifier.base_url" => config.classifier.base_url = value,
            "classifier.model" => config.classifier.model = value,
            "classifier.timeout_secs" => {
                config.classifier.timeout_secs =
                    value.parse().context("timeout_secs must be an integer")?
            },
            "scan.max_image_dimension" => {
                config.scan.max_image_dimension =
                    value.parse().context("max_image_dimension must be an integer")?
            },
            "scan.pace_ms" => {
                config.scan.pace_ms = value.parse().context("pace_ms must be an integer")?
            },
            _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
        }
        self.save(&config)?;
        Ok(())
    }

    /// Check if configuration exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());

        let config = service.init().unwrap();
        assert_eq!(config.embedding.model, "clip-vit-base-patch32");
        assert_eq!(config.embedding.dimensions, 512);
        assert_eq!(config.classifier.timeout_secs, 60);
        assert_eq!(config.scan.max_image_dimension, 1024);
    }

    #[test]
    fn init_creates_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        assert!(service.exists());
    }

    #[test]
    fn load_returns_saved_config() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        let loaded = service.load().unwrap();
        assert_eq!(loaded.storage.metadata_path, ".photo-insight/catalog.db");
        assert_eq!(loaded.storage.vector_path, ".photo-insight/vectors.lance");
    }

    #[test]
    fn load_without_init_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        assert!(service.load().is_err());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = temp_dir.path().join(".photo-insight");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[classifier]\nmodel = \"custom-vlm\"\n",
        )
        .unwrap();

        let service = ConfigService::new(temp_dir.path());
        let config = service.load().unwrap();
        assert_eq!(config.classifier.model, "custom-vlm");
        assert_eq!(config.classifier.timeout_secs, 60);
        assert_eq!(config.embedding.dimensions, 512);
    }

    #[test]
    fn get_and_set_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        service
            .set("embedding.base_url", "http://localhost:9999".to_string())
            .unwrap();
        assert_eq!(
            service.get("embedding.base_url").unwrap(),
            "http://localhost:9999"
        );
    }

    #[test]
    fn set_parses_numeric_values() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        service
            .set("embedding.dimensions", "768".to_string())
            .unwrap();
        assert_eq!(service.load().unwrap().embedding.dimensions, 768);

        assert!(service
            .set("embedding.dimensions", "not-a-number".to_string())
            .is_err());
    }

    #[test]
    fn get_unknown_key_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        assert!(service.get("unknown.key").is_err());
    }

    #[test]
    fn set_unknown_key_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());
        service.init().unwrap();

        assert!(service.set("unknown.key", "value".to_string()).is_err());
    }

    #[test]
    fn resolve_path_keeps_absolute_paths() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(temp_dir.path());

        assert_eq!(
            service.resolve_path("/var/data/catalog.db"),
            PathBuf::from("/var/data/catalog.db")
        );
        assert_eq!(
            service.resolve_path("relative/catalog.db"),
            temp_dir.path().join("relative/catalog.db")
        );
    }
}
