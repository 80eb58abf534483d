//! AccessService - the four lookups the resolver needs

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use shared::{AccessError, PolicyAttachment, PolicyMetadata, Role, Statement};
use std::collections::HashSet;

pub type AccessResult<T> = std::result::Result<T, AccessError>;

/// One page of the attached-policy listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentPage {
    pub attachments: Vec<PolicyAttachment>,

    /// Marker for the next page, `None` on the last page
    pub next_marker: Option<String>,
}

impl AttachmentPage {
    pub fn last(attachments: Vec<PolicyAttachment>) -> Self {
        Self {
            attachments,
            next_marker: None,
        }
    }
}

/// Read-only view of an identity and access service.
///
/// Any backend that can answer these four calls can feed the resolver.
/// `NotFound` must be reported as `AccessError::NotFound`; everything else
/// (network, throttling, permission denied) as `Transport`.
#[async_trait]
pub trait AccessService: Send + Sync {
    /// Fetch a role by name
    async fn get_role(&self, role_name: &str) -> AccessResult<Role>;

    /// Fetch one page of the managed policies attached to a role
    async fn list_attached_policies_page(
        &self,
        role_name: &str,
        marker: Option<&str>,
    ) -> AccessResult<AttachmentPage>;

    /// Fetch policy metadata, including the default version id
    async fn get_policy_metadata(&self, policy_arn: &str) -> AccessResult<PolicyMetadata>;

    /// Fetch the statements of one policy version
    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> AccessResult<Vec<Statement>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Stream every policy attached to a role, following page markers.
///
/// Pages are fetched lazily as the stream is polled. Calling this again
/// restarts the listing from the first page. A marker that was already
/// followed once ends the stream with a `Malformed` error.
pub fn attached_policies<'a, S>(
    service: &'a S,
    role_name: &'a str,
) -> BoxStream<'a, AccessResult<PolicyAttachment>>
where
    S: AccessService + ?Sized,
{
    let state = (Cursor::Start, HashSet::<String>::new());
    stream::try_unfold(state, move |(cursor, mut seen)| async move {
        let marker = match cursor {
            Cursor::Start => None,
            Cursor::Next(marker) => Some(marker),
            Cursor::Done => return Ok(None),
        };

        let page = service
            .list_attached_policies_page(role_name, marker.as_deref())
            .await?;

        let next = match page.next_marker {
            Some(next) if !seen.insert(next.clone()) => {
                return Err(AccessError::malformed(format!(
                    "pagination marker '{}' was already returned",
                    next
                )));
            }
            Some(next) => Cursor::Next(next),
            None => Cursor::Done,
        };

        let items = stream::iter(page.attachments.into_iter().map(Ok::<_, AccessError>));
        Ok(Some((items, (next, seen))))
    })
    .try_flatten()
    .boxed()
}

/// Drain the attachment listing into a vector, in listing order
pub async fn collect_attached_policies<S>(
    service: &S,
    role_name: &str,
) -> AccessResult<Vec<PolicyAttachment>>
where
    S: AccessService + ?Sized,
{
    attached_policies(service, role_name).try_collect().await
}
