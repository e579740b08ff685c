use crate::config::Settings;
use crate::error::{QuerylabError, Result, ValidationError};

/// Settings validator
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validate the settings
    pub fn validate(settings: &Settings) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_search(settings, &mut errors);
        Self::validate_embedding(settings, &mut errors);
        Self::validate_chunking(settings, &mut errors);
        Self::validate_comparison(settings, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(QuerylabError::ConfigValidation { errors })
        }
    }

    fn validate_search(settings: &Settings, errors: &mut Vec<ValidationError>) {
        let search = &settings.search;
        if search.documents_index.trim().is_empty() {
            errors.push(ValidationError::new(
                "search.documents_index",
                "Index name must not be empty",
            ));
        }
        if search.chunks_index.trim().is_empty() {
            errors.push(ValidationError::new(
                "search.chunks_index",
                "Index name must not be empty",
            ));
        }
        if search.documents_index == search.chunks_index {
            errors.push(ValidationError::new(
                "search.chunks_index",
                "Documents and chunks indexes must be distinct",
            ));
        }
        if search.semantic_configuration.trim().is_empty() {
            errors.push(ValidationError::new(
                "search.semantic_configuration",
                "Semantic configuration name must not be empty",
            ));
        }
    }

    fn validate_embedding(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if settings.embedding.deployment.trim().is_empty() {
            errors.push(ValidationError::new(
                "embedding.deployment",
                "Deployment name must not be empty",
            ));
        }
        if settings.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Embedding dimension must be greater than zero",
            ));
        }
    }

    fn validate_chunking(settings: &Settings, errors: &mut Vec<ValidationError>) {
        let chunking = &settings.chunking;
        if chunking.num_tokens == 0 {
            errors.push(ValidationError::new(
                "chunking.num_tokens",
                "Token budget must be greater than zero",
            ));
        }
        if chunking.token_overlap >= chunking.num_tokens {
            errors.push(ValidationError::new(
                "chunking.token_overlap",
                format!(
                    "Token overlap ({}) must be smaller than the token budget ({})",
                    chunking.token_overlap, chunking.num_tokens
                ),
            ));
        }
        if chunking.min_chunk_size > chunking.num_tokens {
            errors.push(ValidationError::new(
                "chunking.min_chunk_size",
                "Minimum chunk size cannot exceed the token budget",
            ));
        }
    }

    fn validate_comparison(settings: &Settings, errors: &mut Vec<ValidationError>) {
        if settings.comparison.scenario_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "comparison.scenario_timeout_secs",
                "Scenario timeout must be greater than zero",
            ));
        }
    }
}
