mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{id_of, TestServer};

fn ids(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|rows| rows.iter().filter_map(|d| d["_id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn archive_and_restore_a_subtree() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let team = owner.create_team("Acme").await?;
    let docs = format!("/api/teams/{}/documents", team);

    let (status, body) = owner.post(&docs, json!({ "title": "Handbook" })).await?;
    assert_eq!(status, StatusCode::CREATED);
    let root = id_of(&body)?;
    let (_, body) = owner.post(&docs, json!({ "title": "Onboarding", "parentDocument": root })).await?;
    let child = id_of(&body)?;

    let (_, body) = owner.get(&docs).await?;
    assert_eq!(ids(&body), vec![root.clone()]);
    let (_, body) = owner.get(&format!("{}?parentDocument={}", docs, root)).await?;
    assert_eq!(ids(&body), vec![child.clone()]);

    let (status, _) = owner.post(&format!("{}/{}/archive", docs, root), Value::Null).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = owner.get(&docs).await?;
    assert!(ids(&body).is_empty());
    let (_, body) = owner.get(&format!("{}/trash", docs)).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    // Restoring only the child detaches it from its archived parent
    let (status, _) = owner.post(&format!("{}/{}/restore", docs, child), Value::Null).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = owner.get(&format!("{}/{}", docs, child)).await?;
    assert_eq!(body["data"]["isArchived"], false);
    assert_eq!(body["data"]["parentDocument"], Value::Null);
    let (_, body) = owner.get(&docs).await?;
    assert_eq!(ids(&body), vec![child]);
    Ok(())
}

#[tokio::test]
async fn published_documents_are_public() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let team = owner.create_team("Acme").await?;
    let docs = format!("/api/teams/{}/documents", team);

    let (_, body) = owner.post(&docs, json!({ "title": "Release notes" })).await?;
    let doc = id_of(&body)?;

    let (status, _) = server.get_public(&format!("/public/documents/{}", doc)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = owner
        .patch(
            &format!("{}/{}", docs, doc),
            json!({ "content": "v1.0 is out", "icon": "🚀", "isPublished": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.get_public(&format!("/public/documents/{}", doc)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "v1.0 is out");
    assert_eq!(body["data"]["icon"], "🚀");

    // Clearing the icon with null
    owner.patch(&format!("{}/{}", docs, doc), json!({ "icon": null })).await?;
    let (_, body) = owner.get(&format!("{}/{}", docs, doc)).await?;
    assert_eq!(body["data"]["icon"], Value::Null);
    assert_eq!(body["data"]["content"], "v1.0 is out");
    Ok(())
}

#[tokio::test]
async fn only_creators_and_admins_delete_documents() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let member = server.login("user_member").await?;
    let team = owner.create_team("Acme").await?;
    owner.invite(&team, &member).await?;
    let docs = format!("/api/teams/{}/documents", team);

    let (_, body) = owner.post(&docs, json!({ "title": "Strategy" })).await?;
    let doc = id_of(&body)?;

    let (status, _) = member.delete(&format!("{}/{}", docs, doc)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = owner.delete(&format!("{}/{}", docs, doc)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = owner.get(&format!("{}/{}", docs, doc)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn upload_serve_and_delete_assets() -> Result<()> {
    let server = TestServer::start().await?;
    let owner = server.login("user_owner").await?;
    let outsider = server.login("user_outsider").await?;
    let team = owner.create_team("Acme").await?;

    let (status, body) = owner
        .post(&format!("/api/teams/{}/storages", team), json!({ "name": "Brand" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let storage = id_of(&body)?;
    let assets_path = format!("{}/api/teams/{}/storages/{}/assets", server.base_url, team, storage);

    let res = server
        .client()
        .post(format!("{}?name=logo.txt", assets_path))
        .bearer_auth(&owner.token)
        .header("content-type", "text/plain")
        .body("not really a logo")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["name"], "logo.txt");
    assert_eq!(body["data"]["contentType"], "text/plain");
    assert_eq!(body["data"]["size"], 17);
    let asset = body["data"]["_id"].as_str().unwrap_or_default().to_string();
    let url = body["data"]["url"].as_str().unwrap_or_default().to_string();

    let served = server.client().get(&url).send().await?;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.text().await?, "not really a logo");

    // Outsiders cannot upload into the team
    let res = server
        .client()
        .post(format!("{}?name=x.txt", assets_path))
        .bearer_auth(&outsider.token)
        .body("x")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let (status, _) = owner.delete(&format!("/api/teams/{}/assets/{}", team, asset)).await?;
    assert_eq!(status, StatusCode::OK);
    let served = server.client().get(&url).send().await?;
    assert_eq!(served.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn oversized_uploads_are_rejected() -> Result<()> {
    let server = TestServer::start_with(|config| config.api.max_request_size_bytes = 1024).await?;
    let owner = server.login("user_owner").await?;
    let team = owner.create_team("Acme").await?;
    let (_, body) = owner
        .post(&format!("/api/teams/{}/storages", team), json!({ "name": "Brand" }))
        .await?;
    let storage = id_of(&body)?;
    let assets_path = format!("/api/teams/{}/storages/{}/assets", team, storage);

    let res = server
        .client()
        .post(format!("{}{}?name=big.bin", server.base_url, assets_path))
        .bearer_auth(&owner.token)
        .body(vec![7u8; server.config.api.max_request_size_bytes + 1])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");

    let (_, body) = owner.get(&assets_path).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    Ok(())
}
