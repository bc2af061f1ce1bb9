pub mod channel;
pub mod document;
pub mod message;
pub mod project;
pub mod report;
pub mod storage;
pub mod task;
pub mod team;
pub mod user;

pub use channel::{Channel, ChannelMember};
pub use document::Document;
pub use message::{Message, MessageType, PollDuration, PollOption, Reaction};
pub use project::{Project, ProjectIcon, ProjectMember};
pub use report::{Report, ReportType};
pub use storage::{Asset, Storage};
pub use task::{Label, Priority, Task, TaskStatus, Template};
pub use team::{Member, Role, Team, TeamStatus};
pub use user::User;

/// Implements `TeamScoped` for records with a `team_id` field.
macro_rules! team_scoped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl crate::database::repository::TeamScoped for $ty {
                fn team_id(&self) -> uuid::Uuid {
                    self.team_id
                }
            }
        )*
    };
}

team_scoped!(
    Member,
    Project,
    ProjectMember,
    Task,
    Label,
    Template,
    Channel,
    ChannelMember,
    Message,
    Reaction,
    Document,
    Storage,
    Asset,
    Report,
);
