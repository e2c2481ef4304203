use crate::config::{Config, ProviderMode};
use crate::error::{Result, ValidationError, VecSearchError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_provider(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_search(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(VecSearchError::ConfigValidation { errors })
        }
    }

    fn validate_provider(config: &Config, errors: &mut Vec<ValidationError>) {
        let provider = &config.provider;

        if provider.dimension == 0 {
            errors.push(ValidationError::new(
                "provider.dimension",
                "Embedding dimension must be greater than 0",
            ));
        }

        if provider.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "provider.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        if provider.max_input_chars == 0 {
            errors.push(ValidationError::new(
                "provider.max_input_chars",
                "Max input length must be greater than 0",
            ));
        }

        if provider.model.trim().is_empty() {
            errors.push(ValidationError::new(
                "provider.model",
                "Model identifier must not be empty",
            ));
        }

        match provider.mode {
            ProviderMode::Service => {
                if provider.service_url.trim().is_empty() {
                    errors.push(ValidationError::new(
                        "provider.service_url",
                        "Embedding service URL is required in service mode",
                    ));
                }
            }
            ProviderMode::Openai => {
                if provider.api_key_env.trim().is_empty() {
                    errors.push(ValidationError::new(
                        "provider.api_key_env",
                        "API key environment variable name is required in openai mode",
                    ));
                }
                if provider.api_base_url.trim().is_empty() {
                    errors.push(ValidationError::new(
                        "provider.api_base_url",
                        "API base URL is required in openai mode",
                    ));
                }
            }
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.batch_size == 0 {
            errors.push(ValidationError::new(
                "indexing.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.default_limit == 0 {
            errors.push(ValidationError::new(
                "search.default_limit",
                "Default result limit must be greater than 0",
            ));
        }

        let threshold = config.search.default_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "search.default_threshold",
                format!("Threshold {} is outside [0.0, 1.0]", threshold),
            ));
        }
    }
}
