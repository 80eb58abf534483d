//! # Rolelens Access
//!
//! The access service boundary: the `AccessService` trait the resolver calls
//! through, the pagination helper that hides page markers, and the backends.
//!
//! ## Backends
//!
//! - `InMemoryAccessService` - in-memory store, loadable from a fixture file
//! - `IamAccessService` - AWS IAM (with feature flag `aws`)

mod service;
mod in_memory;

pub use service::{attached_policies, collect_attached_policies, AccessResult, AccessService, AttachmentPage};
pub use in_memory::{Fixture, FixturePolicy, FixtureRole, InMemoryAccessService};

#[cfg(feature = "aws")]
mod aws;
#[cfg(feature = "aws")]
pub use aws::IamAccessService;
