//! PolicyResolver - resolves one attachment to its active policy document

use access::AccessService;
use shared::{Operation, Policy, PolicyAttachment, ResolveError};
use std::sync::Arc;
use tracing::debug;

/// Resolves a policy attachment through two lookups: metadata, then the
/// document of the default version named by that metadata.
///
/// The two lookups are not re-synchronized. If the default version is
/// rotated or deleted between them, the second lookup reports
/// `PolicyVersionMissing` rather than retrying.
#[derive(Clone)]
pub struct PolicyResolver {
    service: Arc<dyn AccessService>,
}

impl PolicyResolver {
    pub fn new(service: Arc<dyn AccessService>) -> Self {
        Self { service }
    }

    /// Resolve one attachment
    pub async fn resolve(&self, attachment: PolicyAttachment) -> Result<Policy, ResolveError> {
        let arn = attachment.policy_arn.as_str();

        let metadata = self
            .service
            .get_policy_metadata(arn)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ResolveError::PolicyMetadataMissing {
                        arn: arn.to_string(),
                    }
                } else {
                    ResolveError::from_access(Operation::GetPolicyMetadata, arn, e)
                }
            })?;

        let version_id = metadata.default_version_id.as_str();
        let document = self
            .service
            .get_policy_version_document(arn, version_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ResolveError::PolicyVersionMissing {
                        arn: arn.to_string(),
                        version_id: version_id.to_string(),
                    }
                } else {
                    ResolveError::from_access(Operation::GetPolicyVersionDocument, arn, e)
                }
            })?;

        debug!(
            policy_arn = %arn,
            version_id = %version_id,
            statements = document.len(),
            "Resolved policy"
        );

        Ok(Policy::from_parts(attachment, metadata, document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use access::InMemoryAccessService;
    use serde_json::json;
    use shared::{AccessError, PolicyMetadata};

    const ARN: &str = "arn:aws:iam::aws:policy/AmazonEKSWorkerNodePolicy";

    fn create_service() -> InMemoryAccessService {
        let service = InMemoryAccessService::new();
        service.insert_policy(
            ARN,
            PolicyMetadata::new("v3")
                .with_name("AmazonEKSWorkerNodePolicy")
                .with_description("Worker node access"),
            json!({"Version": "2012-10-17", "Statement": [
                {"Effect": "Allow", "Action": ["ec2:DescribeInstances"], "Resource": "*"},
                {"Effect": "Allow", "Action": ["eks:DescribeCluster"], "Resource": "*"}
            ]}),
        );
        service
    }

    fn resolver(service: &InMemoryAccessService) -> PolicyResolver {
        PolicyResolver::new(Arc::new(service.clone()))
    }

    // ============== Success Tests ==============

    #[tokio::test]
    async fn test_resolve_policy() {
        let service = create_service();

        let policy = resolver(&service)
            .resolve(PolicyAttachment::new(ARN).with_name("AmazonEKSWorkerNodePolicy"))
            .await
            .unwrap();

        assert_eq!(policy.policy_arn, ARN);
        assert_eq!(policy.default_version_id, "v3");
        assert_eq!(policy.description.as_deref(), Some("Worker node access"));
        assert_eq!(policy.document.len(), 2);
        assert_eq!(policy.document[1]["Action"][0], "eks:DescribeCluster");
    }

    #[tokio::test]
    async fn test_resolve_uses_default_version() {
        let service = create_service();
        service.insert_policy_version(ARN, "v4", json!({"Statement": {"Effect": "Deny", "Action": "*", "Resource": "*"}}));
        service.set_default_version(ARN, "v4");

        let policy = resolver(&service).resolve(PolicyAttachment::new(ARN)).await.unwrap();

        assert_eq!(policy.default_version_id, "v4");
        assert_eq!(policy.document.len(), 1);
        assert_eq!(policy.document[0]["Effect"], "Deny");
    }

    #[tokio::test]
    async fn test_resolve_makes_two_calls() {
        let service = create_service();

        resolver(&service).resolve(PolicyAttachment::new(ARN)).await.unwrap();

        assert_eq!(service.call_count(Operation::GetPolicyMetadata), 1);
        assert_eq!(service.call_count(Operation::GetPolicyVersionDocument), 1);
    }

    // ============== Failure Tests ==============

    #[tokio::test]
    async fn test_metadata_missing() {
        let service = create_service();

        let err = resolver(&service)
            .resolve(PolicyAttachment::new("arn:aws:iam::123456789012:policy/deleted"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::PolicyMetadataMissing {
                arn: "arn:aws:iam::123456789012:policy/deleted".to_string()
            }
        );
        assert_eq!(service.call_count(Operation::GetPolicyVersionDocument), 0);
    }

    #[tokio::test]
    async fn test_version_missing_after_rotation() {
        let service = create_service();
        service.remove_policy_version(ARN, "v3");

        let err = resolver(&service).resolve(PolicyAttachment::new(ARN)).await.unwrap_err();

        assert_eq!(
            err,
            ResolveError::PolicyVersionMissing {
                arn: ARN.to_string(),
                version_id: "v3".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_on_metadata() {
        let service = create_service();
        service.fail_on(Operation::GetPolicyMetadata, ARN, AccessError::transport("AccessDenied"));

        let err = resolver(&service).resolve(PolicyAttachment::new(ARN)).await.unwrap_err();

        assert_eq!(
            err,
            ResolveError::Transport {
                operation: Operation::GetPolicyMetadata,
                target: ARN.to_string(),
                cause: "AccessDenied".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_on_version() {
        let service = create_service();
        service.fail_on(
            Operation::GetPolicyVersionDocument,
            ARN,
            AccessError::transport("Throttling"),
        );

        let err = resolver(&service).resolve(PolicyAttachment::new(ARN)).await.unwrap_err();

        assert_eq!(err.operation(), Some(Operation::GetPolicyVersionDocument));
        assert_eq!(err.policy_arn(), Some(ARN));
    }

    #[tokio::test]
    async fn test_malformed_document() {
        let service = create_service();
        service.insert_policy("arn:bad", PolicyMetadata::new("v1"), json!("not an object"));

        let err = resolver(&service).resolve(PolicyAttachment::new("arn:bad")).await.unwrap_err();

        assert!(matches!(err, ResolveError::MalformedResponse { .. }));
        assert_eq!(err.policy_arn(), Some("arn:bad"));
    }
}
