//! In-memory fixtures for service tests.
//!
//! Every `TestContext` owns a fresh `MemoryStore` and a throwaway file root,
//! so tests never share state.

use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::config::AppConfig;
use crate::database::models::{Channel, ChannelMember, Member, Message, MessageType, Priority, Project, ProjectIcon, Role, Task, TaskStatus};
use crate::database::{FilterData, MemoryStore, Record, Repository};
use crate::middleware::AuthUser;
use crate::services::access::find_user_by_subject;
use crate::services::teams::{create_team, CreateTeamArgs};
use crate::services::users::store_user;
use crate::services::RequestContext;
use crate::storage::FileStorage;

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub files: Arc<FileStorage>,
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let mut config = AppConfig::development();
        config.storage.root_dir = std::env::temp_dir().join(format!("teamspace-test-{}", Uuid::new_v4().simple()));

        let store = Arc::new(MemoryStore::new());
        let files = FileStorage::new(&config.storage).expect("valid storage config");
        let state = AppState::new(store.clone(), files, config);

        Self {
            store,
            files: state.files.clone(),
            state,
        }
    }

    /// A bare identity carrying only its subject.
    pub fn anonymous(&self, subject: &str) -> RequestContext {
        RequestContext::new(
            self.state.clone(),
            AuthUser {
                subject: subject.to_string(),
                email: None,
                name: None,
                picture: None,
            },
        )
    }

    /// Context for a subject, whether or not a user record exists.
    pub fn ctx(&self, subject: &str) -> RequestContext {
        let mut ctx = self.anonymous(subject);
        ctx.identity.name = Some(subject.to_string());
        ctx.identity.email = Some(format!("{}@example.com", subject));
        ctx
    }

    /// Context for a subject with a stored user record.
    pub async fn user(&self, subject: &str) -> RequestContext {
        let ctx = self.ctx(subject);
        store_user(&ctx).await.expect("store user");
        ctx
    }

    pub async fn user_id(&self, subject: &str) -> Uuid {
        let ctx = self.anonymous(subject);
        find_user_by_subject(&ctx, subject)
            .await
            .expect("user lookup")
            .expect("user exists")
            .id
    }

    /// A fresh team owned by `subject`, with its default channel.
    pub async fn team_with_owner(&self, subject: &str) -> Uuid {
        let ctx = self.user(subject).await;
        create_team(&ctx, CreateTeamArgs { name: format!("{}'s team", subject) })
            .await
            .expect("create team")
    }

    pub async fn member_of(&self, team_id: Uuid, subject: &str, role: Role) -> RequestContext {
        let ctx = self.user(subject).await;
        let user_id = self.user_id(subject).await;
        self.store_record(&Member { user_id, team_id, role }).await;
        ctx
    }

    pub async fn store_record<T: Record>(&self, record: &T) -> Uuid {
        Repository::<T>::new(self.state.store.clone())
            .insert(record)
            .await
            .expect("insert record")
    }

    /// The team's default channel.
    pub async fn general(&self, team_id: Uuid) -> Uuid {
        Repository::<Channel>::new(self.state.store.clone())
            .select_one(FilterData::new().eq_id("teamId", team_id).eq("name", "general"))
            .await
            .expect("channel lookup")
            .expect("general channel exists")
            .id
    }

    pub async fn channel(&self, team_id: Uuid, name: &str, private: bool) -> Uuid {
        self.store_record(&Channel {
            name: name.to_string(),
            icon: "#".to_string(),
            allows_writing: true,
            private,
            team_id,
        })
        .await
    }

    pub async fn add_to_channel(&self, team_id: Uuid, channel_id: Uuid, user_id: Uuid) -> Uuid {
        self.store_record(&ChannelMember { user_id, channel_id, team_id }).await
    }

    pub async fn message(&self, team_id: Uuid, channel_id: Uuid, subject: &str, text: &str) -> Uuid {
        let user_id = self.user_id(subject).await;
        self.store_record(&Message {
            message: text.to_string(),
            kind: MessageType::Text,
            channel_id,
            team_id,
            user_id,
            is_edited: false,
            is_response: false,
            parent_message: None,
            image_url: None,
            question: None,
            options: None,
            allows_multi_answer: None,
            duration: None,
        })
        .await
    }

    pub async fn project(&self, team_id: Uuid, name: &str, public: bool) -> Uuid {
        self.store_record(&Project {
            name: name.to_string(),
            description: String::new(),
            icons: ProjectIcon {
                kind: "folder".to_string(),
                color: "#64748b".to_string(),
            },
            public,
            autojoin: false,
            created_by: Uuid::new_v4(),
            team_id,
        })
        .await
    }

    pub async fn task(&self, team_id: Uuid, project_id: Uuid, title: &str) -> Uuid {
        self.store_record(&Task {
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            label: None,
            due_date: None,
            parent_task: None,
            is_sub_task: false,
            assignee: None,
            project_id,
            team_id,
        })
        .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contexts_are_isolated() {
        let a = TestContext::new();
        let b = TestContext::new();
        a.team_with_owner("owner").await;

        assert_eq!(a.store.len(crate::database::Table::Teams).await, 1);
        assert_eq!(b.store.len(crate::database::Table::Teams).await, 0);
        assert_ne!(a.files.root(), b.files.root());
    }

    #[tokio::test]
    async fn users_are_created_once() {
        let t = TestContext::new();
        t.user("same").await;
        t.user("same").await;
        assert_eq!(t.store.len(crate::database::Table::Users).await, 1);
    }
}
