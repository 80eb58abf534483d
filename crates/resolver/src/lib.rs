//! # Rolelens Resolver
//!
//! Turns a role name into a `Snapshot`: the role, every attached policy and
//! each policy's active document.
//!
//! ## Components
//!
//! - `PolicyResolver` - resolves one attachment to a `Policy`
//! - `RolePolicyAggregator` - drives the whole resolution for a role

mod policy_resolver;
mod aggregator;

pub use policy_resolver::PolicyResolver;
pub use aggregator::RolePolicyAggregator;

// Re-export dependencies
pub use access::AccessService;
pub use shared::{ResolveError, ResolveOptions, ResolutionObserver, Snapshot};
