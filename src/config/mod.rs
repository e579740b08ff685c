//! Configuration management for Querylab
//!
//! This module handles loading and validation of the settings every component
//! receives at construction. Nothing reads configuration globally; the values
//! here are passed in explicitly.

use crate::error::{QuerylabError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod validator;

pub use validator::SettingsValidator;

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub chunking: ChunkingSettings,
    #[serde(default)]
    pub comparison: ComparisonSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
}

/// Search backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Name of the index holding whole documents
    pub documents_index: String,
    /// Name of the index holding document chunks
    pub chunks_index: String,
    /// Semantic ranking configuration name on the backend
    pub semantic_configuration: String,
    /// Tag inserted before a highlighted fragment
    pub highlight_pre_tag: String,
    /// Tag inserted after a highlighted fragment
    pub highlight_post_tag: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            documents_index: "blob-documents".to_string(),
            chunks_index: "blob-chunks".to_string(),
            semantic_configuration: "default".to_string(),
            highlight_pre_tag: "<mark>".to_string(),
            highlight_post_tag: "</mark>".to_string(),
        }
    }
}

/// Embedding gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Deployment (model) name the gateway embeds with
    pub deployment: String,
    /// Embedding dimension produced by the model
    pub dimension: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            deployment: "text-embedding-ada-002".to_string(),
            dimension: 1536,
        }
    }
}

/// Chunking defaults applied when an ingestion record does not override them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSettings {
    /// Token budget per chunk
    pub num_tokens: usize,
    /// Tokens of trailing context repeated at the start of the next chunk
    pub token_overlap: usize,
    /// Chunks estimated below this size are skipped, not stored
    pub min_chunk_size: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            num_tokens: 2048,
            token_overlap: 0,
            min_chunk_size: 10,
        }
    }
}

/// Scenario comparison settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSettings {
    /// Deadline applied to each scenario invocation, in seconds
    pub scenario_timeout_secs: u64,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            scenario_timeout_secs: 60,
        }
    }
}

/// Defaults for the generation parameters carried on chat-engine requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// System role handed to chat engines
    pub system_role_information: String,
    /// Prompt template for the custom orchestration engine
    pub custom_orchestration_prompt: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            system_role_information: "You are an AI assistant that helps people find information."
                .to_string(),
            custom_orchestration_prompt: "Answer the question using only the numbered sources \
                below, and cite the sources you used. If the sources do not contain the answer, \
                say you don't know.\n\nQuestion: {query}\n\nSources:\n{sources}"
                .to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuerylabError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| QuerylabError::Io {
            source: e,
            context: format!("Failed to read settings file: {:?}", path),
        })?;
        let mut settings: Settings = toml::from_str(&content)?;

        // Apply environment variable overrides
        settings.apply_env_overrides();

        // Validate settings
        SettingsValidator::validate(&settings)?;

        Ok(settings)
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| QuerylabError::Io {
            source: e,
            context: format!("Failed to write settings file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: QUERYLAB_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(settings_key) = key.strip_prefix("QUERYLAB_") {
                self.set_value_from_env(settings_key, &value);
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) {
        match path {
            "SEARCH__DOCUMENTS_INDEX" => {
                self.search.documents_index = value.to_string();
            }
            "SEARCH__CHUNKS_INDEX" => {
                self.search.chunks_index = value.to_string();
            }
            "SEARCH__SEMANTIC_CONFIGURATION" => {
                self.search.semantic_configuration = value.to_string();
            }
            "EMBEDDING__DEPLOYMENT" => {
                self.embedding.deployment = value.to_string();
            }
            "CHUNKING__NUM_TOKENS" => {
                if let Ok(parsed) = value.parse() {
                    self.chunking.num_tokens = parsed;
                } else {
                    tracing::warn!("Cannot parse {} override '{}' as integer", path, value);
                }
            }
            "CHUNKING__TOKEN_OVERLAP" => {
                if let Ok(parsed) = value.parse() {
                    self.chunking.token_overlap = parsed;
                } else {
                    tracing::warn!("Cannot parse {} override '{}' as integer", path, value);
                }
            }
            "CHUNKING__MIN_CHUNK_SIZE" => {
                if let Ok(parsed) = value.parse() {
                    self.chunking.min_chunk_size = parsed;
                } else {
                    tracing::warn!("Cannot parse {} override '{}' as integer", path, value);
                }
            }
            _ => {
                tracing::debug!("Unknown env settings key: {}", path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        SettingsValidator::validate(&settings).unwrap();
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.search.chunks_index = "my-chunks".to_string();
        settings.chunking.num_tokens = 512;
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.search.chunks_index, "my-chunks");
        assert_eq!(loaded.chunking.num_tokens, 512);
        assert_eq!(loaded.search.documents_index, "blob-documents");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[search]\ndocuments_index = \"docs\"\nchunks_index = \"chunks\"\n\
             semantic_configuration = \"default\"\nhighlight_pre_tag = \"<em>\"\n\
             highlight_post_tag = \"</em>\"\n",
        )
        .unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.search.highlight_pre_tag, "<em>");
        assert_eq!(loaded.chunking.num_tokens, 2048);
        assert_eq!(loaded.embedding.dimension, 1536);
    }
}
