//! Capability gates over matters.
//!
//! Every gate loads the matter row and decides from it plus at most one
//! share lookup. The returned matter is handed to the caller so gated
//! operations never re-fetch it.

use tracing::debug;
use ulid::Ulid;

use juris_core::{JurisError, Matter, Result, SharePermission, Store};

async fn load_matter<S: Store>(store: &S, matter_id: Ulid) -> Result<Matter> {
    store
        .get_matter(matter_id)
        .await?
        .ok_or_else(|| JurisError::MatterNotFound {
            id: matter_id.to_string(),
        })
}

/// Require view access: the owner, or any share grantee.
pub async fn require_view<S: Store>(store: &S, matter_id: Ulid, user_id: &str) -> Result<Matter> {
    let matter = load_matter(store, matter_id).await?;
    if matter.owner_id == user_id {
        return Ok(matter);
    }

    if store.get_share(matter_id, user_id).await?.is_some() {
        return Ok(matter);
    }

    debug!("View denied on matter {} for user {}", matter_id, user_id);
    Err(JurisError::forbidden(
        "You do not have access to this matter",
    ))
}

/// Require edit access: the owner, or a grantee holding edit permission.
pub async fn require_edit<S: Store>(store: &S, matter_id: Ulid, user_id: &str) -> Result<Matter> {
    let matter = load_matter(store, matter_id).await?;
    if matter.owner_id == user_id {
        return Ok(matter);
    }

    match store.get_share(matter_id, user_id).await? {
        Some(share) if share.permission == SharePermission::Edit => Ok(matter),
        _ => {
            debug!("Edit denied on matter {} for user {}", matter_id, user_id);
            Err(JurisError::forbidden(
                "You do not have edit permission for this matter",
            ))
        }
    }
}

/// Require ownership. The denial message names the blocked operation.
pub async fn require_owner<S: Store>(
    store: &S,
    matter_id: Ulid,
    user_id: &str,
    denial: &str,
) -> Result<Matter> {
    let matter = load_matter(store, matter_id).await?;
    if matter.owner_id == user_id {
        return Ok(matter);
    }

    debug!(
        "Owner check failed on matter {} for user {}",
        matter_id, user_id
    );
    Err(JurisError::forbidden(denial))
}
