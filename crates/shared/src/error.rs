//! Error types for Rolelens

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Access service operation, used to tag errors with the stage that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    GetRole,
    ListAttachedPolicies,
    GetPolicyMetadata,
    GetPolicyVersionDocument,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetRole => "GetRole",
            Operation::ListAttachedPolicies => "ListAttachedPolicies",
            Operation::GetPolicyMetadata => "GetPolicyMetadata",
            Operation::GetPolicyVersionDocument => "GetPolicyVersionDocument",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by an access service backend.
///
/// `NotFound` is kept apart from every other failure: the resolver turns it
/// into a stage-specific error, while transport failures pass through as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("'{resource}' not found")]
    NotFound { resource: String },

    #[error("{message}")]
    Transport { message: String },

    #[error("malformed response: {message}")]
    Malformed { message: String },
}

impl AccessError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Error returned when a role or one of its policies cannot be resolved.
///
/// Every variant names the role or policy arn it concerns so a caller can
/// report exactly what failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "Kind", rename_all_fields = "PascalCase")]
pub enum ResolveError {
    #[error("Role name must not be empty")]
    InvalidRoleName,

    /// `operation` is `GetRole`, or `ListAttachedPolicies` when the role
    /// disappeared between the fetch and the listing
    #[error("Role '{name}' not found ({operation})")]
    RoleNotFound { name: String, operation: Operation },

    #[error("{operation} failed for '{target}': {cause}")]
    Transport {
        operation: Operation,
        target: String,
        cause: String,
    },

    #[error("{operation} returned a malformed response for '{target}': {message}")]
    MalformedResponse {
        operation: Operation,
        target: String,
        message: String,
    },

    #[error("Policy '{arn}' not found")]
    PolicyMetadataMissing { arn: String },

    #[error("Version '{version_id}' of policy '{arn}' not found")]
    PolicyVersionMissing { arn: String, version_id: String },
}

impl ResolveError {
    /// Wrap a non-NotFound access error with the operation and target it came from.
    ///
    /// NotFound has stage-specific meaning and is mapped by the caller before
    /// reaching here; if one slips through it is reported as a transport failure.
    pub fn from_access(operation: Operation, target: impl Into<String>, error: AccessError) -> Self {
        let target = target.into();
        match error {
            AccessError::Malformed { message } => Self::MalformedResponse {
                operation,
                target,
                message,
            },
            other => Self::Transport {
                operation,
                target,
                cause: other.to_string(),
            },
        }
    }

    /// Policy arn this error concerns, for per-policy failures
    pub fn policy_arn(&self) -> Option<&str> {
        match self {
            Self::PolicyMetadataMissing { arn } | Self::PolicyVersionMissing { arn, .. } => {
                Some(arn.as_str())
            }
            Self::Transport {
                operation: Operation::GetPolicyMetadata | Operation::GetPolicyVersionDocument,
                target,
                ..
            }
            | Self::MalformedResponse {
                operation: Operation::GetPolicyMetadata | Operation::GetPolicyVersionDocument,
                target,
                ..
            } => Some(target.as_str()),
            _ => None,
        }
    }

    /// Operation that failed, when the error comes from the access service
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::InvalidRoleName => None,
            Self::RoleNotFound { operation, .. } => Some(*operation),
            Self::Transport { operation, .. } | Self::MalformedResponse { operation, .. } => Some(*operation),
            Self::PolicyMetadataMissing { .. } => Some(Operation::GetPolicyMetadata),
            Self::PolicyVersionMissing { .. } => Some(Operation::GetPolicyVersionDocument),
        }
    }
}

/// General Rolelens error type
#[derive(Debug, Error)]
pub enum RolelensError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, RolelensError>;
