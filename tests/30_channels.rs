mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{id_of, TestServer};

#[tokio::test]
async fn private_channels_are_hidden_from_non_members() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;

    let (status, body) = owner
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "leads", "private": true }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let leads = id_of(&body)?;

    let (_, body) = member.get(&format!("/api/teams/{}/channels/visible", team)).await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|c| c["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["general"]);

    // The full listing shows it, flagged as not joined
    let (_, body) = member.get(&format!("/api/teams/{}/channels", team)).await?;
    let row = body["data"]["page"]
        .as_array()
        .and_then(|rows| rows.iter().find(|c| c["_id"] == leads.as_str()).cloned())
        .unwrap_or(Value::Null);
    assert_eq!(row["isMember"], false);

    let (status, body) = member.get(&format!("/api/teams/{}/channels/{}/messages", team, leads)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You are not a member of this channel.");
    Ok(())
}

#[tokio::test]
async fn channel_membership_management() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;
    let member_user = member.user_id().await?;

    let (_, body) = owner
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "leads", "private": true }))
        .await?;
    let leads = id_of(&body)?;
    let members_path = format!("/api/teams/{}/channels/{}/members", team, leads);

    let (status, body) = owner.post(&members_path, json!({ "userIds": [member_user] })).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    // Everyone selected is already in
    let (status, body) = owner.post(&members_path, json!({ "userIds": [member_user] })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All selected users are already channel members");

    let (_, body) = member.get(&members_path).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, _) = member.post(&format!("/api/teams/{}/channels/{}/leave", team, leads), Value::Null).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = member.get(&members_path).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Leaving a public channel without a membership row is a no-op
    let (_, body) = owner.get(&format!("/api/teams/{}/channels/visible", team)).await?;
    let general = body["data"]
        .as_array()
        .and_then(|rows| rows.iter().find(|c| c["name"] == "general"))
        .and_then(|c| c["_id"].as_str())
        .map(str::to_string)
        .unwrap_or_default();
    let (status, _) = member.post(&format!("/api/teams/{}/channels/{}/leave", team, general), Value::Null).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn only_admins_configure_channels() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;

    let (status, _) = member
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "random" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = owner
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "random" }))
        .await?;
    let random = id_of(&body)?;

    let (status, _) = member
        .patch(&format!("/api/teams/{}/channels/{}", team, random), json!({ "name": "chaos" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = owner.delete(&format!("/api/teams/{}/channels/{}", team, random)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.get(&format!("/api/teams/{}/channels/{}", team, random)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn messages_paginate_newest_first() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let team = owner.create_team("Acme").await?;

    let (_, body) = owner
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "random" }))
        .await?;
    let channel = id_of(&body)?;
    let messages_path = format!("/api/teams/{}/channels/{}/messages", team, channel);

    for text in ["one", "two", "three"] {
        let (status, _) = owner.post(&messages_path, json!({ "message": text })).await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = owner.get(&format!("{}?numItems=2", messages_path)).await?;
    let first = &body["data"];
    assert_eq!(first["page"].as_array().map(Vec::len), Some(2));
    assert_eq!(first["page"][0]["message"], "three");
    assert_eq!(first["isDone"], false);
    assert_eq!(first["page"][0]["author"]["clerkIdentifier"], "user_owner");

    let cursor = first["continueCursor"].as_str().unwrap_or_default().to_string();
    let (_, body) = owner.get(&format!("{}?numItems=2&cursor={}", messages_path, cursor)).await?;
    assert_eq!(body["data"]["page"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["page"][0]["message"], "one");
    assert_eq!(body["data"]["isDone"], true);
    Ok(())
}

#[tokio::test]
async fn new_messages_do_not_shift_older_pages() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let team = owner.create_team("Acme").await?;

    let (_, body) = owner
        .post(&format!("/api/teams/{}/channels", team), json!({ "name": "random" }))
        .await?;
    let channel = id_of(&body)?;
    let messages_path = format!("/api/teams/{}/channels/{}/messages", team, channel);
    let bodies = |page: &Value| -> Vec<String> {
        page["page"]
            .as_array()
            .map(|rows| rows.iter().filter_map(|m| m["message"].as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    for text in ["m1", "m2", "m3", "m4"] {
        owner.post(&messages_path, json!({ "message": text })).await?;
    }
    let (_, body) = owner.get(&format!("{}?numItems=2", messages_path)).await?;
    assert_eq!(bodies(&body["data"]), vec!["m4", "m3"]);
    let cursor = body["data"]["continueCursor"].as_str().unwrap_or_default().to_string();

    // Someone posts while the reader scrolls back
    owner.post(&messages_path, json!({ "message": "m5" })).await?;

    let (_, body) = owner.get(&format!("{}?numItems=2&cursor={}", messages_path, cursor)).await?;
    assert_eq!(bodies(&body["data"]), vec!["m2", "m1"]);
    assert_eq!(body["data"]["isDone"], true);
    Ok(())
}

#[tokio::test]
async fn read_only_channels_accept_admin_posts_only() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;

    let (_, body) = owner
        .post(
            &format!("/api/teams/{}/channels", team),
            json!({ "name": "announcements", "allowsWriting": false }),
        )
        .await?;
    let channel = id_of(&body)?;
    let messages_path = format!("/api/teams/{}/channels/{}/messages", team, channel);

    let (status, _) = member.post(&messages_path, json!({ "message": "hi" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = owner.post(&messages_path, json!({ "message": "Welcome" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn replies_reactions_and_polls() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;

    let (_, body) = owner.get(&format!("/api/teams/{}/channels/visible", team)).await?;
    let general = body["data"][0]["_id"].as_str().unwrap_or_default().to_string();
    let messages_path = format!("/api/teams/{}/channels/{}/messages", team, general);

    let (_, body) = owner.post(&messages_path, json!({ "message": "Lunch?" })).await?;
    let parent = id_of(&body)?;
    let (status, _) = member
        .post(&messages_path, json!({ "message": "Yes", "parentMessage": parent }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = owner.get(&format!("/api/teams/{}/messages/{}/replies", team, parent)).await?;
    assert_eq!(body["data"][0]["message"], "Yes");
    assert_eq!(body["data"][0]["isResponse"], true);

    // Replies stay out of the channel timeline
    let (_, body) = owner.get(&messages_path).await?;
    assert_eq!(body["data"]["page"].as_array().map(Vec::len), Some(1));

    let react_path = format!("/api/teams/{}/messages/{}/reactions", team, parent);
    let (_, body) = member.post(&react_path, json!({ "value": "👍" })).await?;
    assert_eq!(body["data"]["added"], true);
    let (_, body) = owner.get(&messages_path).await?;
    assert_eq!(body["data"]["page"][0]["reactions"][0]["count"], 1);
    let (_, body) = member.post(&react_path, json!({ "value": "👍" })).await?;
    assert_eq!(body["data"]["added"], false);

    let (status, body) = owner
        .post(
            &messages_path,
            json!({ "type": "poll", "question": "Where?", "options": ["Tacos", "Pizza"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let poll = id_of(&body)?;
    let vote_path = format!("/api/teams/{}/messages/{}/votes", team, poll);

    member.post(&vote_path, json!({ "optionIndex": 0 })).await?;
    let (status, body) = member.post(&vote_path, json!({ "optionIndex": 1 })).await?;
    assert_eq!(status, StatusCode::OK);
    // Single-answer polls move the vote
    assert_eq!(body["data"][0]["quantity"], 0);
    assert_eq!(body["data"][1]["quantity"], 1);

    let (status, _) = member.post(&vote_path, json!({ "optionIndex": 5 })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Deleting the parent takes its replies with it
    let (status, _) = member.delete(&format!("/api/teams/{}/messages/{}", team, parent)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = owner.delete(&format!("/api/teams/{}/messages/{}", team, parent)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.get(&format!("/api/teams/{}/messages/{}/replies", team, parent)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
