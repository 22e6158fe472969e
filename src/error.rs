use thiserror::Error;

/// The primary error type for the immich-tz-fixer crate.
///
/// Only run-level failures end up here. Per-asset problems are recorded on the asset's
/// `ResolutionResult` and never abort a batch.
#[derive(Error, Debug)]
pub enum TzFixerError {
    #[error("Timezone boundary dataset failed to load: {0}")]
    Dataset(#[from] crate::boundary::error::DatasetLoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Immich API error: {0}")]
    Immich(#[from] crate::immich::error::ImmichError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, URL_VAR};

    #[test]
    fn test_config_error_names_variable() {
        let err = TzFixerError::from(ConfigError::Missing(URL_VAR));
        assert_eq!(
            err.to_string(),
            "Configuration error: IMMICH_URL environment variable is not set"
        );
    }
}
