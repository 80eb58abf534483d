//! Policy types and policy document parsing

use crate::error::AccessError;
use crate::role::PolicyAttachment;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One rule of a policy document, kept as opaque JSON
pub type Statement = Map<String, Value>;

/// Policy metadata returned by the access service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Version currently in effect
    pub default_version_id: String,
}

impl PolicyMetadata {
    pub fn new(default_version_id: impl Into<String>) -> Self {
        Self {
            policy_name: None,
            description: None,
            default_version_id: default_version_id.into(),
        }
    }

    /// Builder: set policy name
    pub fn with_name(mut self, policy_name: impl Into<String>) -> Self {
        self.policy_name = Some(policy_name.into());
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A policy attached to a role, resolved down to its active document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,

    pub policy_arn: String,

    pub default_version_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Statements of the default version, in document order
    pub document: Vec<Statement>,
}

impl Policy {
    /// Join an attachment with the two lookups made for it.
    ///
    /// The arn always comes from the attachment. Where the attachment and
    /// the metadata both carry a field, the metadata wins.
    pub fn from_parts(
        attachment: PolicyAttachment,
        metadata: PolicyMetadata,
        document: Vec<Statement>,
    ) -> Self {
        Self {
            policy_name: metadata.policy_name.or(attachment.policy_name),
            policy_arn: attachment.policy_arn,
            default_version_id: metadata.default_version_id,
            description: metadata.description,
            document,
        }
    }
}

/// Parse a policy document given as JSON text into its statements.
pub fn statements_from_document(document: &str) -> Result<Vec<Statement>, AccessError> {
    let value: Value = serde_json::from_str(document)
        .map_err(|e| AccessError::malformed(format!("policy document is not valid JSON: {}", e)))?;
    statements_from_value(value)
}

/// Extract the statements of a parsed policy document.
///
/// `Statement` may hold a single object or an array of objects; both come
/// back as a list.
pub fn statements_from_value(value: Value) -> Result<Vec<Statement>, AccessError> {
    let Value::Object(mut document) = value else {
        return Err(AccessError::malformed("policy document is not a JSON object"));
    };

    match document.remove("Statement") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(statement) => Ok(statement),
                _ => Err(AccessError::malformed(format!(
                    "statement {} is not a JSON object",
                    index
                ))),
            })
            .collect(),
        Some(Value::Object(statement)) => Ok(vec![statement]),
        Some(_) => Err(AccessError::malformed(
            "Statement must be an object or an array",
        )),
        None => Err(AccessError::malformed("policy document has no Statement")),
    }
}
