//! Configuration types for Rolelens

use crate::error::{Result, RolelensError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of policies resolved at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Options for one resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveOptions {
    /// Keep going when a policy fails, reporting it in the snapshot's errors
    pub continue_on_policy_error: bool,

    /// Upper bound on in-flight policy resolutions (1 = one at a time)
    pub max_concurrency: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            continue_on_policy_error: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl ResolveOptions {
    /// Resolve policies strictly one after another
    pub fn sequential() -> Self {
        Self {
            max_concurrency: 1,
            ..Default::default()
        }
    }

    /// Builder: set partial-success mode
    pub fn with_continue_on_policy_error(mut self, continue_on_policy_error: bool) -> Self {
        self.continue_on_policy_error = continue_on_policy_error;
        self
    }

    /// Builder: set concurrency cap
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(RolelensError::Config(
                "maxConcurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the AWS IAM backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    /// Region override; the SDK default chain is used when unset
    pub region: Option<String>,

    /// Named profile from the shared AWS config files
    pub profile: Option<String>,
}

/// Rolelens configuration file (rolelens.json / rolelens.yaml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolelensConfig {
    #[serde(default)]
    pub resolution: ResolveOptions,

    #[serde(default)]
    pub aws: AwsConfig,
}

impl RolelensConfig {
    /// Load configuration from a JSON or YAML file, picked by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.resolution.validate()?;
        Ok(config)
    }
}
