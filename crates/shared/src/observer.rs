//! Observer interface for resolution progress

use crate::policy::Policy;
use crate::role::Role;
use crate::snapshot::{PolicyFailure, Snapshot};

/// Receives progress events while a role is being resolved.
///
/// Presentation (progress lines, verbose output) hangs off this trait so the
/// resolver itself never prints anything.
pub trait ResolutionObserver: Send + Sync {
    fn role_fetched(&self, role: &Role);
    fn attachments_listed(&self, role: &Role, count: usize);
    fn policy_resolved(&self, policy: &Policy);
    fn policy_failed(&self, failure: &PolicyFailure);
    fn snapshot_ready(&self, snapshot: &Snapshot);
}

/// No-op observer
#[derive(Debug, Clone, Default)]
pub struct NullObserver;

impl ResolutionObserver for NullObserver {
    fn role_fetched(&self, _role: &Role) {}
    fn attachments_listed(&self, _role: &Role, _count: usize) {}
    fn policy_resolved(&self, _policy: &Policy) {}
    fn policy_failed(&self, _failure: &PolicyFailure) {}
    fn snapshot_ready(&self, _snapshot: &Snapshot) {}
}
