//! Progress lines on stderr

use shared::{Policy, PolicyFailure, ResolutionObserver, Role, Snapshot};

/// Prints resolution progress to stderr, keeping stdout for the snapshot
#[derive(Debug, Clone, Default)]
pub struct ConsoleObserver;

impl ResolutionObserver for ConsoleObserver {
    fn role_fetched(&self, role: &Role) {
        eprintln!("Role fetched: {}", role.arn);
    }

    fn attachments_listed(&self, _role: &Role, count: usize) {
        eprintln!("{} attached policies found.", count);
    }

    fn policy_resolved(&self, policy: &Policy) {
        eprintln!("  ✓ {} ({})", policy.policy_arn, policy.default_version_id);
    }

    fn policy_failed(&self, failure: &PolicyFailure) {
        eprintln!("  ✗ {}: {}", failure.policy_arn, failure.error);
    }

    fn snapshot_ready(&self, snapshot: &Snapshot) {
        eprintln!("{} policies downloaded.", snapshot.policies().len());
        if !snapshot.errors().is_empty() {
            eprintln!("{} policies failed.", snapshot.errors().len());
        }
    }
}
