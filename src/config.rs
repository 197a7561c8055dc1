use serde::{Deserialize, Serialize};

use crate::error::{Result, VectorizerError};

/// Parameters for building signatures and a vectorizer from a corpus
///
/// Every field has a default, so a partial JSON object is accepted:
/// ```
/// use crv_vectorizer::VectorizerConfig;
/// let config = VectorizerConfig::from_json(r#"{ "window_size": 3 }"#).unwrap();
/// assert_eq!(config.window_size, 3);
/// assert_eq!(config.removal_threshold, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// window radius around each center token
    pub window_size: usize,
    /// neighbors seen this many times or fewer are folded into `<UNK>`
    /// 0 disables folding
    pub removal_threshold: u64,
    /// count co-occurrences on the rayon pool
    pub parallel: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            window_size: 2,
            removal_threshold: 0,
            parallel: false,
        }
    }
}

impl VectorizerConfig {
    /// JSONから設定を読み込み、検証する
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(VectorizerError::InvalidConfig(
                "window_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
