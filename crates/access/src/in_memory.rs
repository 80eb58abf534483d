//! In-memory access service
//!
//! Holds roles, attachments and policy versions in memory. Used for tests and
//! for auditing an exported account offline from a fixture file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    statements_from_value, AccessError, Operation, PolicyAttachment, PolicyMetadata, Role,
    RolelensError, Statement,
};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::service::{AccessResult, AccessService, AttachmentPage};

/// Page size used when none is configured
const DEFAULT_PAGE_SIZE: usize = 100;

/// Role entry of a fixture file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FixtureRole {
    #[serde(flatten)]
    pub role: Role,

    #[serde(default)]
    pub attached_policies: Vec<PolicyAttachment>,
}

/// Policy entry of a fixture file, with every stored version's document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FixturePolicy {
    pub arn: String,

    #[serde(flatten)]
    pub metadata: PolicyMetadata,

    /// Version id -> policy document
    #[serde(default)]
    pub versions: BTreeMap<String, Value>,
}

/// Account export loaded by `InMemoryAccessService::from_fixture_file`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fixture {
    #[serde(default)]
    pub roles: Vec<FixtureRole>,

    #[serde(default)]
    pub policies: Vec<FixturePolicy>,
}

#[derive(Debug, Clone)]
struct StoredPolicy {
    metadata: PolicyMetadata,
    versions: HashMap<String, Value>,
}

#[derive(Debug, Default)]
struct Store {
    roles: HashMap<String, Role>,
    attachments: HashMap<String, Vec<PolicyAttachment>>,
    policies: HashMap<String, StoredPolicy>,
    failures: HashMap<(Operation, String), AccessError>,
    latencies: HashMap<String, Duration>,
}

#[derive(Debug, Default)]
struct Counters {
    get_role: AtomicUsize,
    list_pages: AtomicUsize,
    get_policy: AtomicUsize,
    get_policy_version: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Counters {
    fn for_operation(&self, operation: Operation) -> &AtomicUsize {
        match operation {
            Operation::GetRole => &self.get_role,
            Operation::ListAttachedPolicies => &self.list_pages,
            Operation::GetPolicyMetadata => &self.get_policy,
            Operation::GetPolicyVersionDocument => &self.get_policy_version,
        }
    }
}

/// Tracks one in-flight policy lookup
struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory access service.
///
/// Thread-safe; clones share the same store. Failures and latencies can be
/// injected per operation and resource to exercise error paths.
#[derive(Debug, Clone)]
pub struct InMemoryAccessService {
    store: Arc<RwLock<Store>>,
    counters: Arc<Counters>,
    page_size: usize,
}

impl Default for InMemoryAccessService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccessService {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            counters: Arc::new(Counters::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Builder: set how many attachments each listing page holds
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build a service from a parsed fixture
    pub fn from_fixture(fixture: Fixture) -> Self {
        let service = Self::new();
        for entry in fixture.roles {
            let role_name = entry.role.name.clone();
            service.insert_role(entry.role);
            for attachment in entry.attached_policies {
                service.attach_policy(&role_name, attachment);
            }
        }
        for policy in fixture.policies {
            service.insert_policy_versions(policy.arn, policy.metadata, policy.versions);
        }
        service
    }

    /// Load a fixture file (JSON)
    pub fn from_fixture_file(path: &Path) -> Result<Self, RolelensError> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            roles = fixture.roles.len(),
            policies = fixture.policies.len(),
            "Loaded access fixture"
        );
        Ok(Self::from_fixture(fixture))
    }

    // Every mutation leaves the store consistent, so a poisoned lock is recovered.
    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_role(&self, role: Role) {
        let mut store = self.write();
        store.attachments.entry(role.name.clone()).or_default();
        store.roles.insert(role.name.clone(), role);
    }

    /// Append an attachment to a role's listing
    pub fn attach_policy(&self, role_name: &str, attachment: PolicyAttachment) {
        self.write()
            .attachments
            .entry(role_name.to_string())
            .or_default()
            .push(attachment);
    }

    /// Store a policy whose default version holds `document`
    pub fn insert_policy(&self, policy_arn: impl Into<String>, metadata: PolicyMetadata, document: Value) {
        let mut versions = BTreeMap::new();
        versions.insert(metadata.default_version_id.clone(), document);
        self.insert_policy_versions(policy_arn, metadata, versions);
    }

    fn insert_policy_versions(
        &self,
        policy_arn: impl Into<String>,
        metadata: PolicyMetadata,
        versions: BTreeMap<String, Value>,
    ) {
        self.write().policies.insert(
            policy_arn.into(),
            StoredPolicy {
                metadata,
                versions: versions.into_iter().collect(),
            },
        );
    }

    /// Store an additional, non-default version of a policy
    pub fn insert_policy_version(&self, policy_arn: &str, version_id: &str, document: Value) {
        if let Some(policy) = self.write().policies.get_mut(policy_arn) {
            policy.versions.insert(version_id.to_string(), document);
        }
    }

    /// Change which version is in effect
    pub fn set_default_version(&self, policy_arn: &str, version_id: &str) {
        if let Some(policy) = self.write().policies.get_mut(policy_arn) {
            policy.metadata.default_version_id = version_id.to_string();
        }
    }

    pub fn remove_policy_version(&self, policy_arn: &str, version_id: &str) {
        if let Some(policy) = self.write().policies.get_mut(policy_arn) {
            policy.versions.remove(version_id);
        }
    }

    /// Make `operation` fail with `error` for `resource` (role name or policy arn)
    pub fn fail_on(&self, operation: Operation, resource: impl Into<String>, error: AccessError) {
        self.write().failures.insert((operation, resource.into()), error);
    }

    /// Delay every lookup of one policy
    pub fn set_latency(&self, policy_arn: impl Into<String>, latency: Duration) {
        self.write().latencies.insert(policy_arn.into(), latency);
    }

    /// Number of calls made for an operation (pages for the listing)
    pub fn call_count(&self, operation: Operation) -> usize {
        self.counters.for_operation(operation).load(Ordering::SeqCst)
    }

    /// Highest number of policy lookups observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, operation: Operation, resource: &str) -> AccessResult<()> {
        let store = self.read();
        match store.failures.get(&(operation, resource.to_string())) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn simulate_latency(&self, policy_arn: &str) {
        let latency = self.read().latencies.get(policy_arn).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccessService for InMemoryAccessService {
    async fn get_role(&self, role_name: &str) -> AccessResult<Role> {
        self.counters.get_role.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(Operation::GetRole, role_name)?;

        self.read()
            .roles
            .get(role_name)
            .cloned()
            .ok_or_else(|| AccessError::not_found(role_name))
    }

    async fn list_attached_policies_page(
        &self,
        role_name: &str,
        marker: Option<&str>,
    ) -> AccessResult<AttachmentPage> {
        self.counters.list_pages.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(Operation::ListAttachedPolicies, role_name)?;

        let offset = match marker {
            Some(marker) => marker
                .parse::<usize>()
                .map_err(|_| AccessError::transport(format!("Invalid marker '{}'", marker)))?,
            None => 0,
        };

        let store = self.read();
        if !store.roles.contains_key(role_name) {
            return Err(AccessError::not_found(role_name));
        }

        let all = store.attachments.get(role_name).map(Vec::as_slice).unwrap_or_default();
        let end = offset.saturating_add(self.page_size).min(all.len());
        let attachments = all.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_marker = (end < all.len()).then(|| end.to_string());

        Ok(AttachmentPage {
            attachments,
            next_marker,
        })
    }

    async fn get_policy_metadata(&self, policy_arn: &str) -> AccessResult<PolicyMetadata> {
        self.counters.get_policy.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.counters);
        self.simulate_latency(policy_arn).await;
        self.injected_failure(Operation::GetPolicyMetadata, policy_arn)?;

        self.read()
            .policies
            .get(policy_arn)
            .map(|p| p.metadata.clone())
            .ok_or_else(|| AccessError::not_found(policy_arn))
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AccessResult<Vec<Statement>> {
        self.counters.get_policy_version.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.counters);
        self.simulate_latency(policy_arn).await;
        self.injected_failure(Operation::GetPolicyVersionDocument, policy_arn)?;

        let document = self
            .read()
            .policies
            .get(policy_arn)
            .and_then(|p| p.versions.get(version_id))
            .cloned()
            .ok_or_else(|| AccessError::not_found(format!("{}:{}", policy_arn, version_id)))?;

        statements_from_value(document)
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
