use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::{Priority, Report, ReportType};
use crate::database::{FilterData, Stored};
use crate::error::ApiError;
use crate::services::access::is_member;
use crate::services::validation::{required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportArgs {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ReportType,
    pub priority: Priority,
}

/// Reports of a team, newest first.
pub async fn list_reports(ctx: &RequestContext, team_id: Uuid) -> Result<Vec<Stored<Report>>, ApiError> {
    is_member(ctx, team_id).await?;
    Ok(ctx
        .repo::<Report>()
        .select_any(FilterData::new().eq_id("teamId", team_id).desc())
        .await?)
}

pub async fn create_report(ctx: &RequestContext, team_id: Uuid, args: CreateReportArgs) -> Result<Uuid, ApiError> {
    let membership = is_member(ctx, team_id).await?;
    let report = Report {
        title: required_text("title", &args.title, NAME_MAX)?,
        description: required_text("description", &args.description, TEXT_MAX)?,
        kind: args.kind,
        priority: args.priority,
        team_id,
        created_by: membership.user_id(),
    };
    let id = ctx.repo::<Report>().insert(&report).await?;
    tracing::info!("User {} filed report {} in team {}", membership.user_id(), id, team_id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn members_file_and_read_reports() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let member = t.member_of(team, "member", Role::Member).await;
        let outsider = t.user("outsider").await;

        let args: CreateReportArgs = serde_json::from_value(serde_json::json!({
            "title": "Button overlaps header",
            "description": "On small screens",
            "type": "ui/ux",
            "priority": "low"
        }))
        .unwrap();

        assert!(create_report(&outsider, team, args.clone()).await.is_err());
        create_report(&member, team, args).await.unwrap();

        let reports = list_reports(&t.ctx("owner"), team).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportType::UiUx);
        assert_eq!(reports[0].created_by, t.user_id("member").await);
    }
}
