use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Poll,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PollDuration {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "8h")]
    EightHours,
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
}

impl PollDuration {
    pub fn as_duration(&self) -> Duration {
        match self {
            PollDuration::OneHour => Duration::hours(1),
            PollDuration::FourHours => Duration::hours(4),
            PollDuration::EightHours => Duration::hours(8),
            PollDuration::OneDay => Duration::hours(24),
            PollDuration::ThreeDays => Duration::days(3),
            PollDuration::OneWeek => Duration::weeks(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOption {
    pub text: String,
    pub quantity: u32,
    pub votes: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub channel_id: Uuid,
    pub team_id: Uuid,
    pub user_id: Uuid,
    pub is_edited: bool,
    pub is_response: bool,
    pub parent_message: Option<Uuid>,
    pub image_url: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<PollOption>>,
    pub allows_multi_answer: Option<bool>,
    pub duration: Option<PollDuration>,
}

impl Record for Message {
    const TABLE: Table = Table::Messages;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub value: String,
}

impl Record for Reaction {
    const TABLE: Table = Table::Reactions;
}
