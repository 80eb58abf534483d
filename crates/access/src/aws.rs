//! AWS IAM access service
//!
//! Configuration via standard AWS SDK chain (env vars, shared profiles,
//! instance profile, etc.)

use async_trait::async_trait;
use aws_sdk_iam::error::DisplayErrorContext;
use aws_sdk_iam::Client;
use shared::{
    statements_from_document, AccessError, AwsConfig, PolicyAttachment, PolicyMetadata, Role,
    Statement,
};
use tracing::{debug, info};

use crate::service::{AccessResult, AccessService, AttachmentPage};

/// Access service backed by AWS IAM
#[derive(Debug, Clone)]
pub struct IamAccessService {
    client: Client,
}

impl IamAccessService {
    /// Create a new IAM access service
    ///
    /// # Arguments
    /// * `config` - Optional region and profile; unset values fall back to the SDK defaults
    pub async fn new(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        info!(
            region = ?config.region,
            profile = ?config.profile,
            "Initialized AWS IAM access service"
        );
        Self::from_client(Client::new(&sdk_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn transport<E: std::error::Error>(error: E) -> AccessError {
    AccessError::transport(DisplayErrorContext(error).to_string())
}

/// IAM returns policy documents URL-encoded
fn decode_document(encoded: &str) -> AccessResult<Vec<Statement>> {
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| AccessError::malformed(format!("policy document is not valid UTF-8: {}", e)))?;
    statements_from_document(&decoded)
}

#[async_trait]
impl AccessService for IamAccessService {
    async fn get_role(&self, role_name: &str) -> AccessResult<Role> {
        debug!(role = %role_name, "GetRole");

        let response = self
            .client
            .get_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) {
                    AccessError::not_found(role_name)
                } else {
                    transport(e)
                }
            })?;

        let role = response
            .role()
            .ok_or_else(|| AccessError::malformed("GetRole response has no Role"))?;

        Ok(Role {
            name: role.role_name().to_string(),
            arn: role.arn().to_string(),
            description: role.description().map(str::to_string),
        })
    }

    async fn list_attached_policies_page(
        &self,
        role_name: &str,
        marker: Option<&str>,
    ) -> AccessResult<AttachmentPage> {
        debug!(role = %role_name, marker = ?marker, "ListAttachedRolePolicies");

        let response = self
            .client
            .list_attached_role_policies()
            .role_name(role_name)
            .set_marker(marker.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) {
                    AccessError::not_found(role_name)
                } else {
                    transport(e)
                }
            })?;

        let attachments = response
            .attached_policies()
            .iter()
            .map(|attached| {
                let policy_arn = attached
                    .policy_arn()
                    .ok_or_else(|| AccessError::malformed("attached policy has no PolicyArn"))?;
                Ok(PolicyAttachment {
                    policy_arn: policy_arn.to_string(),
                    policy_name: attached.policy_name().map(str::to_string),
                })
            })
            .collect::<AccessResult<Vec<_>>>()?;

        let next_marker = if response.is_truncated() {
            let next = response
                .marker()
                .ok_or_else(|| AccessError::malformed("truncated listing has no Marker"))?;
            Some(next.to_string())
        } else {
            None
        };

        Ok(AttachmentPage {
            attachments,
            next_marker,
        })
    }

    async fn get_policy_metadata(&self, policy_arn: &str) -> AccessResult<PolicyMetadata> {
        debug!(policy_arn = %policy_arn, "GetPolicy");

        let response = self
            .client
            .get_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) {
                    AccessError::not_found(policy_arn)
                } else {
                    transport(e)
                }
            })?;

        let policy = response
            .policy()
            .ok_or_else(|| AccessError::malformed("GetPolicy response has no Policy"))?;
        let default_version_id = policy
            .default_version_id()
            .ok_or_else(|| AccessError::malformed("policy has no DefaultVersionId"))?;

        Ok(PolicyMetadata {
            policy_name: policy.policy_name().map(str::to_string),
            description: policy.description().map(str::to_string),
            default_version_id: default_version_id.to_string(),
        })
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AccessResult<Vec<Statement>> {
        debug!(policy_arn = %policy_arn, version_id = %version_id, "GetPolicyVersion");

        let response = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_entity_exception()) {
                    AccessError::not_found(format!("{}:{}", policy_arn, version_id))
                } else {
                    transport(e)
                }
            })?;

        let document = response
            .policy_version()
            .and_then(|v| v.document())
            .ok_or_else(|| AccessError::malformed("policy version has no Document"))?;

        decode_document(document)
    }

    fn name(&self) -> &str {
        "aws-iam"
    }
}
