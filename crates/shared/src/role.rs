//! Role and attachment types

use serde::{Deserialize, Serialize};

/// A named identity in the access service.
///
/// Serialized with the access service's own field names so a rendered
/// snapshot reads like the service's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    /// Role name, unique within the account
    #[serde(rename = "RoleName")]
    pub name: String,

    /// Globally unique resource identifier
    pub arn: String,

    /// Role description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    /// Create a role without description
    pub fn new(name: impl Into<String>, arn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arn: arn.into(),
            description: None,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Link between a role and a managed policy, as returned by the attachment listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyAttachment {
    /// Join key for every later lookup
    pub policy_arn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
}

impl PolicyAttachment {
    pub fn new(policy_arn: impl Into<String>) -> Self {
        Self {
            policy_arn: policy_arn.into(),
            policy_name: None,
        }
    }

    /// Builder: set display name
    pub fn with_name(mut self, policy_name: impl Into<String>) -> Self {
        self.policy_name = Some(policy_name.into());
        self
    }
}
