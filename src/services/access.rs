//! Authorization helpers gating every service operation.
//!
//! Resolution is a lookup-and-compare: the caller's identity subject finds a
//! user row, `(teamId, userId)` finds the membership row, and admin-gated
//! actions compare its role against `Role::ADMIN_ROLES`.

use uuid::Uuid;

use crate::database::models::{Member, Role, User};
use crate::database::{FilterData, Record, Stored, TeamScoped};
use crate::error::ApiError;
use crate::services::RequestContext;

/// The caller's user row and membership in one team.
#[derive(Debug, Clone)]
pub struct Membership {
    pub user: Stored<User>,
    pub member: Stored<Member>,
}

impl Membership {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn team_id(&self) -> Uuid {
        self.member.team_id
    }

    pub fn role(&self) -> Role {
        self.member.role
    }

    pub fn is_admin(&self) -> bool {
        self.member.role.is_admin()
    }
}

/// Resolve the caller's user record.
pub async fn is_auth(ctx: &RequestContext) -> Result<Stored<User>, ApiError> {
    find_user_by_subject(ctx, &ctx.identity.subject)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Must be logged in."))
}

pub async fn find_user_by_subject(ctx: &RequestContext, subject: &str) -> Result<Option<Stored<User>>, ApiError> {
    let filter = FilterData::new().eq("clerkIdentifier", subject);
    Ok(ctx.repo::<User>().select_one(filter).await?)
}

pub async fn find_member(ctx: &RequestContext, team_id: Uuid, user_id: Uuid) -> Result<Option<Stored<Member>>, ApiError> {
    let filter = FilterData::new().eq_id("teamId", team_id).eq_id("userId", user_id);
    Ok(ctx.repo::<Member>().select_one(filter).await?)
}

/// Caller must hold a membership row for the team.
pub async fn is_member(ctx: &RequestContext, team_id: Uuid) -> Result<Membership, ApiError> {
    let user = is_auth(ctx).await?;
    match find_member(ctx, team_id, user.id).await? {
        Some(member) => Ok(Membership { user, member }),
        None => {
            tracing::debug!("User {} is not a member of team {}", user.id, team_id);
            Err(ApiError::forbidden("You are not a member of this team"))
        }
    }
}

/// Caller must be an owner or admin of the team.
pub async fn is_admin(ctx: &RequestContext, team_id: Uuid) -> Result<Membership, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    if !membership.is_admin() {
        return Err(ApiError::no_permission());
    }
    Ok(membership)
}

/// Caller must be the team owner.
pub async fn is_owner(ctx: &RequestContext, team_id: Uuid) -> Result<Membership, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    if membership.role() != Role::Owner {
        return Err(ApiError::no_permission());
    }
    Ok(membership)
}

/// Load a record that must belong to `team_id`. Records of other teams are
/// reported as missing.
pub async fn load_in_team<T: Record + TeamScoped>(
    ctx: &RequestContext,
    id: Uuid,
    team_id: Uuid,
    what: &str,
) -> Result<Stored<T>, ApiError> {
    match ctx.repo::<T>().get(id).await? {
        Some(record) if record.team_id() == team_id => Ok(record),
        _ => Err(ApiError::not_found(format!("{} not found", what))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn unknown_identity_is_unauthorized() {
        let t = TestContext::new();
        let ctx = t.anonymous("nobody");
        assert_eq!(is_auth(&ctx).await.unwrap_err(), ApiError::unauthorized("Must be logged in."));
    }

    #[tokio::test]
    async fn roles_gate_access() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let admin = t.member_of(team, "admin", Role::Admin).await;
        let member = t.member_of(team, "member", Role::Member).await;
        let outsider = t.user("outsider").await;

        assert!(is_owner(&t.ctx("owner"), team).await.is_ok());
        assert!(is_admin(&admin, team).await.is_ok());
        assert_eq!(is_owner(&admin, team).await.unwrap_err(), ApiError::no_permission());
        assert!(is_member(&member, team).await.is_ok());
        assert_eq!(is_admin(&member, team).await.unwrap_err(), ApiError::no_permission());
        assert_eq!(
            is_member(&outsider, team).await.unwrap_err(),
            ApiError::forbidden("You are not a member of this team")
        );
    }
}
