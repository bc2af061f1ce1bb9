use anyhow::Context;
use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::app::AppState;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::models::{Priority, Role, TaskStatus};
use crate::database::DatabaseManager;
use crate::middleware::AuthUser;
use crate::services::access::{find_member, find_user_by_subject};
use crate::services::channels::{create_channel, CreateChannelArgs};
use crate::services::documents::{create_document, CreateDocumentArgs};
use crate::services::members::{update_member_role, UpdateRoleArgs};
use crate::services::projects::{create_project, CreateProjectArgs};
use crate::services::tasks::{create_task, CreateTaskArgs};
use crate::services::teams::{create_team, disable_join_code, join_team, regenerate_join_code, CreateTeamArgs, JoinTeamArgs};
use crate::services::users::store_user;
use crate::services::RequestContext;
use crate::storage::FileStorage;

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Load a YAML fixture into the configured database")]
    Load {
        #[arg(help = "Path to the fixture file")]
        path: PathBuf,
    },
}

pub async fn handle(cmd: FixtureCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        FixtureCommands::Load { path } => handle_load(&path, output_format).await,
    }
}

async fn handle_load(path: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let fixture = Fixture::from_file(path)?;

    let app_config = config();
    DatabaseManager::require_url(&app_config.database)?;
    let store = DatabaseManager::connect(&app_config.database).await?;
    let files = FileStorage::new(&app_config.storage)?;
    let state = AppState::new(store, files, app_config.clone());

    let summary = load_fixture(&state, &fixture).await?;
    output_success(
        &output_format,
        &format!("Loaded fixture {}", path.display()),
        Some(json!({
            "teams": summary.teams,
            "users": summary.users,
            "records": summary.records,
        })),
    )
}

/// Fixture file layout. Every team is created by its owner through the same
/// service calls the API uses, so permissions and defaults apply as usual.
#[derive(Debug, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub teams: Vec<FixtureTeam>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureTeam {
    pub name: String,
    pub owner: FixtureUser,
    #[serde(default)]
    pub members: Vec<FixtureMember>,
    #[serde(default)]
    pub channels: Vec<CreateChannelArgs>,
    #[serde(default)]
    pub projects: Vec<FixtureProject>,
    #[serde(default)]
    pub documents: Vec<CreateDocumentArgs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureUser {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureMember {
    #[serde(flatten)]
    pub user: FixtureUser,
    #[serde(default = "default_role")]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct FixtureProject {
    #[serde(flatten)]
    pub project: CreateProjectArgs,
    #[serde(default)]
    pub tasks: Vec<FixtureTask>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<i64>,
}

fn default_role() -> Role {
    Role::Member
}

#[derive(Debug, Default, PartialEq)]
pub struct FixtureSummary {
    pub teams: usize,
    pub users: usize,
    pub records: usize,
}

impl Fixture {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid fixture {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

impl FixtureUser {
    fn context(&self, state: &AppState) -> RequestContext {
        RequestContext::new(
            state.clone(),
            AuthUser {
                subject: self.subject.clone(),
                email: self.email.clone(),
                name: self.name.clone(),
                picture: self.picture.clone(),
            },
        )
    }
}

pub async fn load_fixture(state: &AppState, fixture: &Fixture) -> anyhow::Result<FixtureSummary> {
    let mut summary = FixtureSummary::default();

    for team in &fixture.teams {
        let owner = team.owner.context(state);
        store_user(&owner).await?;
        summary.users += 1;

        let team_id = create_team(&owner, CreateTeamArgs { name: team.name.clone() })
            .await
            .with_context(|| format!("failed to create team {}", team.name))?;
        summary.teams += 1;

        if !team.members.is_empty() {
            let join_code = regenerate_join_code(&owner, team_id).await?;
            for member in &team.members {
                let ctx = member.user.context(state);
                store_user(&ctx).await?;
                join_team(&ctx, JoinTeamArgs { join_code })
                    .await
                    .with_context(|| format!("{} failed to join {}", member.user.subject, team.name))?;
                summary.users += 1;

                if member.role != Role::Member {
                    let user = find_user_by_subject(&ctx, &member.user.subject)
                        .await?
                        .context("joined user disappeared")?;
                    let membership = find_member(&ctx, team_id, user.id)
                        .await?
                        .context("membership disappeared")?;
                    update_member_role(&owner, team_id, membership.id, UpdateRoleArgs { role: member.role }).await?;
                }
            }
            disable_join_code(&owner, team_id).await?;
        }

        for channel in &team.channels {
            create_channel(&owner, team_id, channel.clone()).await?;
            summary.records += 1;
        }

        for project in &team.projects {
            let project_id = create_project(&owner, team_id, project.project.clone()).await?;
            summary.records += 1;

            for task in &project.tasks {
                create_task(
                    &owner,
                    team_id,
                    CreateTaskArgs {
                        title: task.title.clone(),
                        description: task.description.clone(),
                        status: task.status.unwrap_or(TaskStatus::Todo),
                        priority: task.priority.unwrap_or(Priority::Medium),
                        label: None,
                        due_date: task.due_date,
                        parent_task: None,
                        assignee: None,
                        project_id,
                    },
                )
                .await?;
                summary.records += 1;
            }
        }

        for document in &team.documents {
            create_document(&owner, team_id, document.clone()).await?;
            summary.records += 1;
        }

        tracing::info!("Loaded fixture team {} ({})", team.name, team_id);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Channel, Member, Project, Task};
    use crate::database::{FilterData, Repository};
    use crate::testing::TestContext;

    const DEMO: &str = include_str!("../../../fixtures/demo.yaml");

    #[test]
    fn parses_demo_fixture() {
        let fixture = Fixture::from_yaml(DEMO).unwrap();
        let team = &fixture.teams[0];
        assert_eq!(team.owner.subject, "user_ada");
        assert_eq!(team.members[0].role, Role::Admin);
        assert_eq!(team.members[1].role, Role::Member);
        assert!(!team.channels[0].allows_writing);
        assert!(team.channels[1].private);
        assert!(team.projects[0].project.public);
        assert!(!team.projects[1].project.public);
        assert_eq!(team.projects[0].tasks[0].priority, Some(Priority::High));
    }

    #[test]
    fn rejects_team_without_owner() {
        assert!(Fixture::from_yaml("teams:\n  - name: Orphan\n").is_err());
    }

    #[tokio::test]
    async fn loads_demo_fixture_through_services() {
        let t = TestContext::new();
        let fixture = Fixture::from_yaml(DEMO).unwrap();

        let summary = load_fixture(&t.state, &fixture).await.unwrap();
        assert_eq!(summary.teams, 1);
        assert_eq!(summary.users, 3);
        // 2 channels, 2 projects, 2 tasks, 2 documents
        assert_eq!(summary.records, 8);

        let store = t.state.store.clone();
        let members = Repository::<Member>::new(store.clone())
            .select_any(FilterData::new())
            .await
            .unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members.iter().filter(|m| m.role == Role::Admin).count(), 1);

        let channels = Repository::<Channel>::new(store.clone())
            .select_any(FilterData::new())
            .await
            .unwrap();
        // general + announcements + leads
        assert_eq!(channels.len(), 3);

        let projects = Repository::<Project>::new(store.clone())
            .select_any(FilterData::new())
            .await
            .unwrap();
        assert_eq!(projects.len(), 2);
        let tasks = Repository::<Task>::new(store).select_any(FilterData::new()).await.unwrap();
        assert_eq!(tasks.len(), 2);
    }
}
