use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::model::Source;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

/// Tunables for the looser matcher tiers. Exact order-id and tracking-id
/// matching are always on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Characters of the primary item name compared by the fuzzy tier.
    #[serde(default = "default_fuzzy_prefix_len")]
    pub fuzzy_prefix_len: usize,
    #[serde(default = "default_true")]
    pub item_id_tier: bool,
    #[serde(default = "default_true")]
    pub fuzzy_name_tier: bool,
}

fn default_fuzzy_prefix_len() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_prefix_len: default_fuzzy_prefix_len(),
            item_id_tier: true,
            fuzzy_name_tier: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Which extractors feed the ledger. Facts from a disabled source are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_true")]
    pub amazon: bool,
    #[serde(default = "default_true")]
    pub ebay: bool,
    #[serde(default = "default_true")]
    pub manual: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            amazon: true,
            ebay: true,
            manual: true,
        }
    }
}

impl SourcesConfig {
    pub fn is_enabled(&self, source: Source) -> bool {
        match source {
            Source::Amazon => self.amazon,
            Source::Ebay => self.ebay,
            Source::Manual => self.manual,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LedgerConfig {
    pub fn from_toml(input: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            toml::from_str(input).map_err(|e| LedgerError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.matcher.fuzzy_prefix_len == 0 {
            return Err(LedgerError::ConfigValidation(
                "matcher.fuzzy_prefix_len must be at least 1".into(),
            ));
        }

        if !self.sources.amazon && !self.sources.ebay && !self.sources.manual {
            return Err(LedgerError::ConfigValidation(
                "at least one source must be enabled".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let input = r#"
[matcher]
fuzzy_prefix_len = 12
item_id_tier = false

[sources]
ebay = false
"#;
        let config = LedgerConfig::from_toml(input).unwrap();
        assert_eq!(config.matcher.fuzzy_prefix_len, 12);
        assert!(!config.matcher.item_id_tier);
        assert!(config.matcher.fuzzy_name_tier);
        assert!(config.sources.amazon);
        assert!(!config.sources.is_enabled(Source::Ebay));
    }

    #[test]
    fn empty_input_is_default() {
        let config = LedgerConfig::from_toml("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.matcher.fuzzy_prefix_len, 20);
    }

    #[test]
    fn reject_zero_prefix() {
        let err = LedgerConfig::from_toml("[matcher]\nfuzzy_prefix_len = 0\n").unwrap_err();
        assert!(err.to_string().contains("fuzzy_prefix_len"));
    }

    #[test]
    fn reject_all_sources_disabled() {
        let input = "[sources]\namazon = false\nebay = false\nmanual = false\n";
        let err = LedgerConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least one source"));
    }

    #[test]
    fn reject_unknown_type() {
        let err = LedgerConfig::from_toml("[matcher]\nfuzzy_prefix_len = \"twenty\"\n");
        assert!(err.is_err());
    }
}
