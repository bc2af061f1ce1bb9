#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use teamspace_api::app::{app, AppState};
use teamspace_api::auth::{generate_jwt, Claims};
use teamspace_api::config::AppConfig;
use teamspace_api::database::MemoryStore;
use teamspace_api::storage::FileStorage;

/// One API server per test, bound to a free port and backed by a fresh
/// memory store.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub config: AppConfig,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Like `start`, with a chance to adjust the configuration first.
    pub async fn start_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.api.port = port;
        config.api.enable_request_logging = false;
        config.storage.root_dir = std::env::temp_dir().join(format!("teamspace-it-{}", uuid::Uuid::new_v4().simple()));
        config.storage.public_base_url = format!("{}/files/", base_url);
        configure(&mut config);

        let files = FileStorage::new(&config.storage)?;
        let state = AppState::new(Arc::new(MemoryStore::new()), files, config.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app(state)).await {
                eprintln!("test server stopped: {e}");
            }
        });

        let server = Self {
            port,
            base_url,
            config,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    /// Bearer token for `subject`, signed with the server's secret.
    pub fn token(&self, subject: &str) -> Result<String> {
        let claims = Claims::new(
            subject,
            Some(format!("{}@example.com", subject)),
            Some(subject.to_string()),
            1,
        );
        Ok(generate_jwt(&claims, &self.config.security)?)
    }

    /// A client acting as `subject`, with its user record already stored.
    pub async fn login(&self, subject: &str) -> Result<Caller<'_>> {
        let caller = Caller {
            server: self,
            token: self.token(subject)?,
        };
        let (status, _) = caller.post("/api/users/me", Value::Null).await?;
        anyhow::ensure!(status == StatusCode::OK, "storing user {} failed: {}", subject, status);
        Ok(caller)
    }

    pub async fn get_public(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(format!("{}{}", self.base_url, path)).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

pub struct Caller<'a> {
    server: &'a TestServer,
    pub token: String,
}

impl<'a> Caller<'a> {
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .server
            .client
            .request(method, format!("{}{}", self.server.base_url, path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None).await
    }

    /// `Value::Null` sends no body.
    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let body = (!body.is_null()).then_some(body);
        self.send(Method::POST, path, body).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn delete_with(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, Some(body)).await
    }

    pub async fn user_id(&self) -> Result<String> {
        let (_, body) = self.get("/api/users/me").await?;
        body["data"]["_id"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("no user id in {}", body))
    }

    /// Create a team and return its id.
    pub async fn create_team(&self, name: &str) -> Result<String> {
        let (status, body) = self.post("/api/teams", serde_json::json!({ "name": name })).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create team failed: {} {}", status, body);
        id_of(&body)
    }

    /// Issue a join code as this caller and redeem it as `other`.
    pub async fn invite(&self, team: &str, other: &Caller<'_>) -> Result<()> {
        let (status, body) = self.post(&format!("/api/teams/{}/join-code", team), Value::Null).await?;
        anyhow::ensure!(status == StatusCode::OK, "join code failed: {} {}", status, body);
        let code = body["data"]["joinCode"].clone();

        let (status, body) = other.post("/api/teams/join", serde_json::json!({ "joinCode": code })).await?;
        anyhow::ensure!(status == StatusCode::OK, "join failed: {} {}", status, body);
        Ok(())
    }
}

/// `data.id` of a create response.
pub fn id_of(body: &Value) -> Result<String> {
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("no id in {}", body))
}
