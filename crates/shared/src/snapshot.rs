//! Snapshot - the resolved permission set of one role

use crate::error::ResolveError;
use crate::policy::Policy;
use crate::role::Role;
use serde::Serialize;

/// A policy that could not be resolved while partial results were allowed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyFailure {
    pub policy_arn: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,

    pub error: ResolveError,
}

/// Role plus every attached policy with its active document.
///
/// Built once per resolution and never modified. Serializes flat: the role's
/// fields at the top level, then `Policies` and, when any policy failed,
/// `Errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
    #[serde(flatten)]
    role: Role,

    policies: Vec<Policy>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<PolicyFailure>,
}

impl Snapshot {
    pub fn new(role: Role, policies: Vec<Policy>, errors: Vec<PolicyFailure>) -> Self {
        Self {
            role,
            policies,
            errors,
        }
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Resolved policies in attachment listing order
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Policies that failed to resolve, in listing order
    pub fn errors(&self) -> &[PolicyFailure] {
        &self.errors
    }

    /// True when every attachment resolved
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of attachments the listing returned
    pub fn attachment_count(&self) -> usize {
        self.policies.len() + self.errors.len()
    }

    /// Total statements across all resolved policies
    pub fn statement_count(&self) -> usize {
        self.policies.iter().map(|p| p.document.len()).sum()
    }

    pub fn policy_arns(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.policy_arn.as_str()).collect()
    }

    pub fn into_parts(self) -> (Role, Vec<Policy>, Vec<PolicyFailure>) {
        (self.role, self.policies, self.errors)
    }
}
