//! Private-account visibility rules.

use crate::domain::entities::{FollowRepository, User};
use crate::shared::error::AppError;

/// Domain service deciding who may see an account's content.
pub struct VisibilityService;

impl VisibilityService {
    /// Content of a public account is visible to everyone. Content of a
    /// private account is visible to its owner and to accepted followers.
    pub async fn can_view_content(
        owner: &User,
        viewer_id: Option<i64>,
        follows: &dyn FollowRepository,
    ) -> Result<bool, AppError> {
        if !owner.is_private {
            return Ok(true);
        }
        let Some(viewer_id) = viewer_id else {
            return Ok(false);
        };
        if viewer_id == owner.id {
            return Ok(true);
        }
        Ok(follows
            .find(viewer_id, owner.id)
            .await?
            .is_some_and(|follow| follow.is_accepted()))
    }

    /// Like [`can_view_content`](Self::can_view_content), but fails with
    /// `ACCESS_DENIED` instead of returning `false`.
    pub async fn ensure_can_view(
        owner: &User,
        viewer_id: Option<i64>,
        follows: &dyn FollowRepository,
    ) -> Result<(), AppError> {
        if Self::can_view_content(owner, viewer_id, follows).await? {
            Ok(())
        } else {
            Err(AppError::access_denied())
        }
    }
}
