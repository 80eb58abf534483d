//! RolePolicyAggregator - resolves a role into a complete Snapshot

use access::{collect_attached_policies, AccessService};
use futures::stream::{self, StreamExt};
use shared::{
    NullObserver, Operation, Policy, PolicyAttachment, PolicyFailure, ResolveError,
    ResolveOptions, ResolutionObserver, Role, Snapshot,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::policy_resolver::PolicyResolver;

/// Resolves a role name into a `Snapshot`.
///
/// The role is fetched first, then the attachment listing is drained
/// completely, then every attachment is resolved. Up to
/// `max_concurrency` policies are resolved at once; results are always
/// returned in listing order.
///
/// By default the first policy failure (in listing order) aborts the whole
/// resolution and no snapshot is returned. With `continue_on_policy_error`
/// failed policies are left out of `policies` and reported in `errors`.
pub struct RolePolicyAggregator {
    service: Arc<dyn AccessService>,
    resolver: PolicyResolver,
    options: ResolveOptions,
    observer: Arc<dyn ResolutionObserver>,
}

impl RolePolicyAggregator {
    pub fn new(service: Arc<dyn AccessService>, options: ResolveOptions) -> Self {
        Self {
            resolver: PolicyResolver::new(service.clone()),
            service,
            options,
            observer: Arc::new(NullObserver),
        }
    }

    /// Builder: report progress to an observer
    pub fn with_observer(mut self, observer: Arc<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve a role and all of its attached policies
    pub async fn resolve(&self, role_name: &str) -> Result<Snapshot, ResolveError> {
        if role_name.trim().is_empty() {
            return Err(ResolveError::InvalidRoleName);
        }

        debug!(role = %role_name, backend = %self.service.name(), "Resolving role");

        let role = self.fetch_role(role_name).await?;
        self.observer.role_fetched(&role);

        let attachments = self.list_attachments(role_name).await?;
        debug!(role = %role_name, attachments = attachments.len(), "Attachments listed");
        self.observer.attachments_listed(&role, attachments.len());

        let (policies, errors) = self.resolve_policies(attachments).await?;

        let snapshot = Snapshot::new(role, policies, errors);
        info!(
            role = %role_name,
            policies = snapshot.policies().len(),
            failed = snapshot.errors().len(),
            "Role resolved"
        );
        self.observer.snapshot_ready(&snapshot);

        Ok(snapshot)
    }

    async fn fetch_role(&self, role_name: &str) -> Result<Role, ResolveError> {
        self.service.get_role(role_name).await.map_err(|e| {
            if e.is_not_found() {
                ResolveError::RoleNotFound {
                    name: role_name.to_string(),
                    operation: Operation::GetRole,
                }
            } else {
                ResolveError::from_access(Operation::GetRole, role_name, e)
            }
        })
    }

    async fn list_attachments(&self, role_name: &str) -> Result<Vec<PolicyAttachment>, ResolveError> {
        collect_attached_policies(self.service.as_ref(), role_name)
            .await
            .map_err(|e| {
                // The role existed a moment ago; deleted in between
                if e.is_not_found() {
                    ResolveError::RoleNotFound {
                        name: role_name.to_string(),
                        operation: Operation::ListAttachedPolicies,
                    }
                } else {
                    ResolveError::from_access(Operation::ListAttachedPolicies, role_name, e)
                }
            })
    }

    async fn resolve_policies(
        &self,
        attachments: Vec<PolicyAttachment>,
    ) -> Result<(Vec<Policy>, Vec<PolicyFailure>), ResolveError> {
        let concurrency = self.options.max_concurrency.max(1);

        // `buffered` yields in input order regardless of completion order.
        let mut results = stream::iter(attachments)
            .map(|attachment| {
                let policy_arn = attachment.policy_arn.clone();
                let policy_name = attachment.policy_name.clone();
                async move {
                    self.resolver
                        .resolve(attachment)
                        .await
                        .map_err(|error| PolicyFailure {
                            policy_arn,
                            policy_name,
                            error,
                        })
                }
            })
            .buffered(concurrency);

        let mut policies = Vec::new();
        let mut errors = Vec::new();

        while let Some(result) = results.next().await {
            match result {
                Ok(policy) => {
                    self.observer.policy_resolved(&policy);
                    policies.push(policy);
                }
                Err(failure) => {
                    self.observer.policy_failed(&failure);
                    if !self.options.continue_on_policy_error {
                        warn!(
                            policy_arn = %failure.policy_arn,
                            error = %failure.error,
                            "Policy resolution failed, aborting"
                        );
                        // Dropping the stream cancels resolutions still in flight
                        return Err(failure.error);
                    }
                    warn!(
                        policy_arn = %failure.policy_arn,
                        error = %failure.error,
                        "Policy resolution failed, skipping"
                    );
                    errors.push(failure);
                }
            }
        }

        Ok((policies, errors))
    }
}
