//! Configuration for the subtitles core
//!
//! Every field has a default, so an empty TOML file is a valid config.

use crate::error::{Result, SubtitlesError};
use crate::protocol::DecodeOptions;
use crate::transcript::{MergeMode, TableOptions};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Dispatcher and decoder settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SubtitlesConfig {
    /// Reject envelopes carrying keys the decoder does not know
    pub reject_unknown_fields: bool,

    /// Reject envelopes missing `timestamp`, `seqId` or `round`
    pub require_metadata: bool,

    /// Report chunks whose `(round, seqId)` goes backwards on a side
    pub check_ordering: bool,

    /// Finalized lines retained for sealed-write detection
    pub max_sealed_messages: usize,

    /// Unfinished lines retained before the oldest is dropped
    pub max_streaming_messages: usize,

    /// How ASR (user) chunks combine
    pub asr_merge: MergeMode,

    /// How LLM (agent) chunks combine
    pub llm_merge: MergeMode,

    /// Default tracing filter for the replay binary
    pub log_filter: String,
}

impl Default for SubtitlesConfig {
    fn default() -> Self {
        Self {
            reject_unknown_fields: false,
            require_metadata: false,
            check_ordering: true,
            max_sealed_messages: 256,
            max_streaming_messages: 64,
            asr_merge: MergeMode::Append,
            llm_merge: MergeMode::Append,
            log_filter: "subtitles=debug,info".to_string(),
        }
    }
}

impl SubtitlesConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SubtitlesConfig = toml::from_str(content)
            .map_err(|e| SubtitlesError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail closed on unknown envelope keys
    pub fn with_strict_decoding(mut self) -> Self {
        self.reject_unknown_fields = true;
        self
    }

    pub fn with_required_metadata(mut self) -> Self {
        self.require_metadata = true;
        self
    }

    pub fn with_asr_merge(mut self, merge: MergeMode) -> Self {
        self.asr_merge = merge;
        self
    }

    pub fn with_llm_merge(mut self, merge: MergeMode) -> Self {
        self.llm_merge = merge;
        self
    }

    pub fn with_max_sealed_messages(mut self, max: usize) -> Self {
        self.max_sealed_messages = max;
        self
    }

    pub fn with_max_streaming_messages(mut self, max: usize) -> Self {
        self.max_streaming_messages = max;
        self
    }

    pub fn without_order_checks(mut self) -> Self {
        self.check_ordering = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_sealed_messages == 0 {
            return Err(SubtitlesError::ConfigError(
                "max_sealed_messages must be at least 1".to_string(),
            ));
        }
        if self.max_streaming_messages == 0 {
            return Err(SubtitlesError::ConfigError(
                "max_streaming_messages must be at least 1".to_string(),
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(SubtitlesError::ConfigError(
                "log_filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            reject_unknown_fields: self.reject_unknown_fields,
            require_metadata: self.require_metadata,
        }
    }

    pub fn table_options(&self) -> TableOptions {
        TableOptions {
            asr_merge: self.asr_merge,
            llm_merge: self.llm_merge,
            check_ordering: self.check_ordering,
            max_sealed_messages: self.max_sealed_messages,
            max_streaming_messages: self.max_streaming_messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SubtitlesConfig::default();
        assert!(!config.reject_unknown_fields);
        assert!(config.check_ordering);
        assert_eq!(config.max_sealed_messages, 256);
        assert_eq!(config.asr_merge, MergeMode::Append);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SubtitlesConfig::default()
            .with_strict_decoding()
            .with_asr_merge(MergeMode::Replace)
            .without_order_checks();

        assert!(config.decode_options().reject_unknown_fields);
        assert!(!config.decode_options().require_metadata);
        let table = config.table_options();
        assert_eq!(table.asr_merge, MergeMode::Replace);
        assert_eq!(table.llm_merge, MergeMode::Append);
        assert!(!table.check_ordering);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = SubtitlesConfig::from_toml("").unwrap();
        assert_eq!(config.log_filter, "subtitles=debug,info");
    }

    #[test]
    fn test_partial_toml() {
        let config = SubtitlesConfig::from_toml(
            r#"
            reject_unknown_fields = true
            asr_merge = "replace"
            max_sealed_messages = 8
            max_streaming_messages = 4
            require_metadata = true
            "#,
        )
        .unwrap();
        assert!(config.reject_unknown_fields);
        assert_eq!(config.asr_merge, MergeMode::Replace);
        assert_eq!(config.max_sealed_messages, 8);
        assert_eq!(config.table_options().max_streaming_messages, 4);
        assert!(config.decode_options().require_metadata);
        assert!(config.check_ordering);
    }

    #[test]
    fn test_invalid_toml() {
        let err = SubtitlesConfig::from_toml("asr_merge = \"shuffle\"").unwrap_err();
        assert!(matches!(err, SubtitlesError::ConfigError(_)));

        let err = SubtitlesConfig::from_toml("max_sealed_messages = 0").unwrap_err();
        assert!(matches!(err, SubtitlesError::ConfigError(_)));

        let err = SubtitlesConfig::from_toml("max_streaming_messages = 0").unwrap_err();
        assert!(matches!(err, SubtitlesError::ConfigError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "check_ordering = false").unwrap();

        let config = SubtitlesConfig::load(file.path()).unwrap();
        assert!(!config.check_ordering);

        let missing = SubtitlesConfig::load("/nonexistent/subtitles.toml").unwrap_err();
        assert!(matches!(missing, SubtitlesError::IOError(_)));
        assert!(!missing.is_recoverable());
    }
}
