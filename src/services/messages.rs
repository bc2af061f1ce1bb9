use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::models::{Message, MessageType, PollDuration, PollOption, Reaction, User};
use crate::database::{DatabaseError, FilterData, Stored, WriteBatch};
use crate::error::ApiError;
use crate::services::access::load_in_team;
use crate::services::channels::readable_channel;
use crate::services::validation::{optional_text, required_text, NAME_MAX, TEXT_MAX};
use crate::services::RequestContext;
use crate::types::{Page, PageRequest};

const MAX_POLL_OPTIONS: usize = 10;
const VOTE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageArgs {
    #[serde(rename = "type", default)]
    pub kind: Option<MessageType>,
    #[serde(default)]
    pub message: String,
    pub parent_message: Option<Uuid>,
    pub image_url: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub allows_multi_answer: Option<bool>,
    pub duration: Option<PollDuration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMessageArgs {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteArgs {
    pub option_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionArgs {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReactionSummary {
    pub value: String,
    pub count: usize,
    pub users: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Stored<Message>,
    pub author: Option<Stored<User>>,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionToggled {
    pub added: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditPatch<'a> {
    message: &'a str,
    is_edited: bool,
}

#[derive(Debug, Serialize)]
struct OptionsPatch<'a> {
    options: &'a [PollOption],
}

async fn with_details(ctx: &RequestContext, message: Stored<Message>) -> Result<MessageView, ApiError> {
    let author = ctx.repo::<User>().get(message.user_id).await?;
    let reactions = ctx
        .repo::<Reaction>()
        .select_any(FilterData::new().eq_id("messageId", message.id))
        .await?;

    let mut grouped: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
    for reaction in reactions {
        grouped.entry(reaction.value.clone()).or_default().push(reaction.user_id);
    }
    let reactions = grouped
        .into_iter()
        .map(|(value, users)| ReactionSummary { value, count: users.len(), users })
        .collect();

    Ok(MessageView { message, author, reactions })
}

/// Top-level messages of a channel, newest first.
pub async fn list_messages(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
    request: &PageRequest,
) -> Result<Page<MessageView>, ApiError> {
    readable_channel(ctx, team_id, channel_id).await?;

    let filter = FilterData::new()
        .eq_id("channelId", channel_id)
        .eq("isResponse", false)
        .desc();
    let page = ctx.repo::<Message>().paginate(filter, request).await?;

    let mut views = Vec::with_capacity(page.page.len());
    for message in page.page {
        views.push(with_details(ctx, message).await?);
    }
    Ok(Page {
        page: views,
        is_done: page.is_done,
        continue_cursor: page.continue_cursor,
    })
}

/// Replies to a message in posting order.
pub async fn list_replies(ctx: &RequestContext, team_id: Uuid, message_id: Uuid) -> Result<Vec<MessageView>, ApiError> {
    let parent = load_in_team::<Message>(ctx, message_id, team_id, "Message").await?;
    readable_channel(ctx, team_id, parent.channel_id).await?;

    let replies = ctx
        .repo::<Message>()
        .select_any(FilterData::new().eq_id("parentMessage", parent.id))
        .await?;

    let mut views = Vec::with_capacity(replies.len());
    for reply in replies {
        views.push(with_details(ctx, reply).await?);
    }
    Ok(views)
}

pub async fn send_message(
    ctx: &RequestContext,
    team_id: Uuid,
    channel_id: Uuid,
    args: SendMessageArgs,
) -> Result<Uuid, ApiError> {
    let (membership, channel) = readable_channel(ctx, team_id, channel_id).await?;
    if !channel.allows_writing && !membership.is_admin() {
        return Err(ApiError::forbidden("Only admins can post in this channel."));
    }

    if let Some(parent_id) = args.parent_message {
        let parent = load_in_team::<Message>(ctx, parent_id, team_id, "Parent message").await?;
        if parent.channel_id != channel_id || parent.is_response {
            return Err(ApiError::invalid_field("parentMessage", "must be a top-level message in this channel"));
        }
    }

    let kind = args.kind.unwrap_or(MessageType::Text);
    let mut message = Message {
        message: String::new(),
        kind,
        channel_id,
        team_id,
        user_id: membership.user_id(),
        is_edited: false,
        is_response: args.parent_message.is_some(),
        parent_message: args.parent_message,
        image_url: None,
        question: None,
        options: None,
        allows_multi_answer: None,
        duration: None,
    };

    match kind {
        MessageType::Text => {
            message.message = required_text("message", &args.message, TEXT_MAX)?;
        }
        MessageType::Image => {
            message.image_url = Some(required_text("imageUrl", args.image_url.as_deref().unwrap_or_default(), TEXT_MAX)?);
            message.message = optional_text("message", Some(args.message.as_str()), TEXT_MAX)?.unwrap_or_default();
        }
        MessageType::Poll => {
            let question = required_text("question", args.question.as_deref().unwrap_or_default(), TEXT_MAX)?;
            let options = args
                .options
                .unwrap_or_default()
                .iter()
                .map(|text| required_text("options", text, NAME_MAX))
                .collect::<Result<Vec<_>, _>>()?;
            if options.len() < 2 || options.len() > MAX_POLL_OPTIONS {
                return Err(ApiError::invalid_field(
                    "options",
                    format!("a poll needs between 2 and {} options", MAX_POLL_OPTIONS),
                ));
            }
            message.message = question.clone();
            message.question = Some(question);
            message.options = Some(
                options
                    .into_iter()
                    .map(|text| PollOption { text, quantity: 0, votes: Vec::new() })
                    .collect(),
            );
            message.allows_multi_answer = Some(args.allows_multi_answer.unwrap_or(false));
            message.duration = Some(args.duration.unwrap_or(PollDuration::OneDay));
        }
    }

    let id = ctx.repo::<Message>().insert(&message).await?;
    tracing::debug!("User {} posted message {} in channel {}", membership.user_id(), id, channel_id);
    Ok(id)
}

/// Authors edit the text of their own messages.
pub async fn update_message(
    ctx: &RequestContext,
    team_id: Uuid,
    message_id: Uuid,
    args: UpdateMessageArgs,
) -> Result<(), ApiError> {
    let message = load_in_team::<Message>(ctx, message_id, team_id, "Message").await?;
    let (membership, _) = readable_channel(ctx, team_id, message.channel_id).await?;
    if message.user_id != membership.user_id() {
        return Err(ApiError::no_permission());
    }
    if message.kind == MessageType::Poll {
        return Err(ApiError::bad_request("Polls cannot be edited"));
    }

    let text = required_text("message", &args.message, TEXT_MAX)?;
    ctx.repo::<Message>()
        .patch(message_id, &EditPatch { message: &text, is_edited: true })
        .await?;
    Ok(())
}

/// Authors and admins delete messages together with replies and reactions.
pub async fn delete_message(ctx: &RequestContext, team_id: Uuid, message_id: Uuid) -> Result<(), ApiError> {
    let message = load_in_team::<Message>(ctx, message_id, team_id, "Message").await?;
    let (membership, _) = readable_channel(ctx, team_id, message.channel_id).await?;
    if message.user_id != membership.user_id() && !membership.is_admin() {
        return Err(ApiError::no_permission());
    }

    let replies = ctx
        .repo::<Message>()
        .select_any(FilterData::new().eq_id("parentMessage", message.id))
        .await?;

    let mut batch = WriteBatch::new();
    for target in replies.iter().map(|r| r.id).chain(std::iter::once(message.id)) {
        let reactions = ctx
            .repo::<Reaction>()
            .select_any(FilterData::new().eq_id("messageId", target))
            .await?;
        for reaction in reactions {
            batch.delete::<Reaction>(reaction.id);
        }
        batch.delete::<Message>(target);
    }
    batch.commit(ctx.store()).await?;
    Ok(())
}

/// Toggle the caller's vote on one option. Single-answer polls move an
/// existing vote to the chosen option. A vote that raced another one is
/// recomputed from the fresh options.
pub async fn vote_poll(
    ctx: &RequestContext,
    team_id: Uuid,
    message_id: Uuid,
    args: VoteArgs,
) -> Result<Vec<PollOption>, ApiError> {
    let mut attempt = 1;
    loop {
        let message = load_in_team::<Message>(ctx, message_id, team_id, "Message").await?;
        let (membership, _) = readable_channel(ctx, team_id, message.channel_id).await?;

        let (Some(current), MessageType::Poll) = (message.options.clone(), message.kind) else {
            return Err(ApiError::bad_request("Message is not a poll"));
        };
        let duration = message.duration.unwrap_or(PollDuration::OneDay);
        if Utc::now() > message.creation_time + duration.as_duration() {
            return Err(ApiError::bad_request("This poll is closed"));
        }
        if args.option_index >= current.len() {
            return Err(ApiError::invalid_field("optionIndex", "is out of range"));
        }

        let options = toggle_vote(
            current.clone(),
            args.option_index,
            membership.user_id(),
            message.allows_multi_answer.unwrap_or(false),
        );
        let mut batch = WriteBatch::new();
        batch.require_unchanged::<Message, _>(message.id, "options", &current, "The poll changed, please vote again")?;
        batch.patch::<Message, _>(message.id, &OptionsPatch { options: &options })?;

        match batch.commit(ctx.store()).await {
            Err(DatabaseError::Conflict(_)) if attempt < VOTE_ATTEMPTS => attempt += 1,
            result => return result.map(|()| options).map_err(ApiError::from),
        }
    }
}

fn toggle_vote(mut options: Vec<PollOption>, index: usize, user_id: Uuid, multi: bool) -> Vec<PollOption> {
    let already = options[index].votes.contains(&user_id);
    for (i, option) in options.iter_mut().enumerate() {
        if i == index {
            if already {
                option.votes.retain(|v| *v != user_id);
            } else {
                option.votes.push(user_id);
            }
        } else if !multi {
            option.votes.retain(|v| *v != user_id);
        }
        option.quantity = option.votes.len() as u32;
    }
    options
}

/// Add the caller's reaction, or remove it when already present.
pub async fn toggle_reaction(
    ctx: &RequestContext,
    team_id: Uuid,
    message_id: Uuid,
    args: ReactionArgs,
) -> Result<ReactionToggled, ApiError> {
    let message = load_in_team::<Message>(ctx, message_id, team_id, "Message").await?;
    let (membership, _) = readable_channel(ctx, team_id, message.channel_id).await?;
    let value = required_text("value", &args.value, 32)?;

    let reactions = ctx.repo::<Reaction>();
    let mine = FilterData::new()
        .eq_id("messageId", message.id)
        .eq_id("userId", membership.user_id())
        .eq("value", value.as_str());

    match reactions.select_one(mine.clone()).await? {
        Some(reaction) => {
            reactions.delete(reaction.id).await?;
            Ok(ReactionToggled { added: false })
        }
        None => {
            let mut batch = WriteBatch::new();
            batch.require_absent::<Reaction>(mine, "Reaction already added");
            batch.insert(&Reaction {
                message_id: message.id,
                user_id: membership.user_id(),
                team_id,
                value,
            })?;
            batch.commit(ctx.store()).await?;
            Ok(ReactionToggled { added: true })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Channel, Role};
    use crate::database::Table;
    use crate::testing::TestContext;

    fn text(body: &str) -> SendMessageArgs {
        SendMessageArgs { message: body.to_string(), ..Default::default() }
    }

    fn poll(multi: bool) -> SendMessageArgs {
        SendMessageArgs {
            kind: Some(MessageType::Poll),
            question: Some("Lunch?".into()),
            options: Some(vec!["Pizza".into(), "Sushi".into(), "Tacos".into()]),
            allows_multi_answer: Some(multi),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn messages_list_newest_first_with_replies_separate() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let owner = t.ctx("owner");
        let channel = t.general(team).await;

        let first = send_message(&owner, team, channel, text("first")).await.unwrap();
        send_message(&owner, team, channel, text("second")).await.unwrap();
        send_message(&owner, team, channel, SendMessageArgs { parent_message: Some(first), ..text("reply") })
            .await
            .unwrap();

        let page = list_messages(&owner, team, channel, &PageRequest::new(10, None)).await.unwrap();
        let bodies: Vec<&str> = page.page.iter().map(|m| m.message.message.as_str()).collect();
        assert_eq!(bodies, vec!["second", "first"]);
        assert!(page.page[0].author.is_some());

        let replies = list_replies(&owner, team, first).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].message.is_response);
    }

    #[tokio::test]
    async fn read_only_channels_accept_admin_posts_only() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let member = t.member_of(team, "member", Role::Member).await;
        let announcements = t
            .store_record(&Channel {
                name: "announcements".into(),
                icon: "#".into(),
                allows_writing: false,
                private: false,
                team_id: team,
            })
            .await;

        assert!(matches!(
            send_message(&member, team, announcements, text("hi")).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));
        send_message(&t.ctx("owner"), team, announcements, text("welcome")).await.unwrap();
    }

    #[tokio::test]
    async fn private_channel_messages_need_channel_membership() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let member = t.member_of(team, "member", Role::Member).await;
        let secret = t.channel(team, "secret", true).await;
        let msg = t.message(team, secret, "owner", "classified").await;

        assert!(list_messages(&member, team, secret, &PageRequest::new(10, None)).await.is_err());
        assert!(send_message(&member, team, secret, text("let me in")).await.is_err());
        assert!(toggle_reaction(&member, team, msg, ReactionArgs { value: "👍".into() }).await.is_err());
    }

    #[tokio::test]
    async fn editing_and_deleting_respect_authorship() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let a = t.member_of(team, "a", Role::Member).await;
        let b = t.member_of(team, "b", Role::Member).await;
        let channel = t.general(team).await;

        let id = send_message(&a, team, channel, text("hello")).await.unwrap();
        let reply = send_message(&b, team, channel, SendMessageArgs { parent_message: Some(id), ..text("hey") })
            .await
            .unwrap();
        toggle_reaction(&b, team, reply, ReactionArgs { value: "🎉".into() }).await.unwrap();

        let edit = || UpdateMessageArgs { message: "hello there".into() };
        assert_eq!(update_message(&b, team, id, edit()).await.unwrap_err(), ApiError::no_permission());
        update_message(&a, team, id, edit()).await.unwrap();
        let stored = a.repo::<Message>().get(id).await.unwrap().unwrap();
        assert!(stored.is_edited);
        assert_eq!(stored.message, "hello there");

        assert_eq!(delete_message(&b, team, id).await.unwrap_err(), ApiError::no_permission());
        delete_message(&t.ctx("owner"), team, id).await.unwrap();
        assert_eq!(t.store.len(Table::Messages).await, 0);
        assert_eq!(t.store.len(Table::Reactions).await, 0);
    }

    #[tokio::test]
    async fn reactions_toggle_and_group() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let owner = t.ctx("owner");
        let member = t.member_of(team, "member", Role::Member).await;
        let channel = t.general(team).await;
        let id = send_message(&owner, team, channel, text("ship it")).await.unwrap();

        let thumbs = || ReactionArgs { value: "👍".into() };
        assert!(toggle_reaction(&owner, team, id, thumbs()).await.unwrap().added);
        assert!(toggle_reaction(&member, team, id, thumbs()).await.unwrap().added);

        let page = list_messages(&owner, team, channel, &PageRequest::new(10, None)).await.unwrap();
        assert_eq!(page.page[0].reactions[0].count, 2);

        assert!(!toggle_reaction(&owner, team, id, thumbs()).await.unwrap().added);
        let page = list_messages(&owner, team, channel, &PageRequest::new(10, None)).await.unwrap();
        assert_eq!(page.page[0].reactions[0].count, 1);
    }

    #[tokio::test]
    async fn single_answer_polls_move_votes() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let owner = t.ctx("owner");
        let channel = t.general(team).await;
        let id = send_message(&owner, team, channel, poll(false)).await.unwrap();

        vote_poll(&owner, team, id, VoteArgs { option_index: 0 }).await.unwrap();
        let options = vote_poll(&owner, team, id, VoteArgs { option_index: 1 }).await.unwrap();
        let counts: Vec<u32> = options.iter().map(|o| o.quantity).collect();
        assert_eq!(counts, vec![0, 1, 0]);

        let options = vote_poll(&owner, team, id, VoteArgs { option_index: 1 }).await.unwrap();
        assert!(options.iter().all(|o| o.quantity == 0));

        assert!(matches!(
            vote_poll(&owner, team, id, VoteArgs { option_index: 9 }).await.unwrap_err(),
            ApiError::ValidationError { .. }
        ));
    }

    #[tokio::test]
    async fn polls_close_after_their_duration() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let owner = t.ctx("owner");
        let channel = t.general(team).await;
        let two_hours_ago = Utc::now() - chrono::Duration::hours(2);

        let short = SendMessageArgs { duration: Some(PollDuration::OneHour), ..poll(false) };
        let short = send_message(&owner, team, channel, short).await.unwrap();
        t.store.set_creation_time(Table::Messages, short, two_hours_ago).await;
        assert_eq!(
            vote_poll(&owner, team, short, VoteArgs { option_index: 0 }).await.unwrap_err(),
            ApiError::bad_request("This poll is closed")
        );

        let long = SendMessageArgs { duration: Some(PollDuration::ThreeDays), ..poll(false) };
        let long = send_message(&owner, team, channel, long).await.unwrap();
        t.store.set_creation_time(Table::Messages, long, two_hours_ago).await;
        let options = vote_poll(&owner, team, long, VoteArgs { option_index: 0 }).await.unwrap();
        assert_eq!(options[0].quantity, 1);
    }

    #[tokio::test]
    async fn simultaneous_votes_all_count() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let owner = t.ctx("owner");
        let channel = t.general(team).await;
        let id = send_message(&owner, team, channel, poll(false)).await.unwrap();

        let mut voters = Vec::new();
        for n in 0..6 {
            voters.push(t.member_of(team, &format!("voter{}", n), Role::Member).await);
        }
        let votes = voters.iter().map(|voter| vote_poll(voter, team, id, VoteArgs { option_index: 2 }));
        for result in futures::future::join_all(votes).await {
            result.unwrap();
        }

        let stored = owner.repo::<Message>().select_404(id).await.unwrap();
        let options = stored.options.clone().unwrap();
        assert_eq!(options[2].quantity, 6);
        assert_eq!(options[2].votes.len(), 6);
    }

    #[test]
    fn multi_answer_polls_keep_votes() {
        let user = Uuid::new_v4();
        let options = vec![
            PollOption { text: "a".into(), quantity: 0, votes: vec![] },
            PollOption { text: "b".into(), quantity: 0, votes: vec![] },
        ];
        let options = toggle_vote(options, 0, user, true);
        let options = toggle_vote(options, 1, user, true);
        assert_eq!(options[0].quantity, 1);
        assert_eq!(options[1].quantity, 1);
    }

    #[tokio::test]
    async fn polls_need_two_options() {
        let t = TestContext::new();
        let team = t.team_with_owner("owner").await;
        let channel = t.general(team).await;
        let args = SendMessageArgs { options: Some(vec!["only".into()]), ..poll(false) };
        assert!(matches!(
            send_message(&t.ctx("owner"), team, channel, args).await.unwrap_err(),
            ApiError::ValidationError { .. }
        ));
    }
}
