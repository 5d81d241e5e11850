#![allow(dead_code)]

use std::sync::Arc;

use hostwarden::gateway::{AppState, run_gateway_with_listener};
use hostwarden::session::{SessionManager, SessionSettings};
use hostwarden::tools::Tool;
use reqwest::StatusCode;
use serde_json::Value;

use crate::agent_harness::{CountingTool, EagerPolicy, manager, registry};

/// A gateway on an ephemeral local port whose agent always requests `tool`.
pub struct GatewayTestServer {
    pub addr: std::net::SocketAddr,
    pub client: reqwest::Client,
    pub sessions: Arc<SessionManager>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl GatewayTestServer {
    pub async fn start(tool: &Arc<CountingTool>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let addr = listener.local_addr().unwrap();

        let tools = [Arc::clone(tool)];
        let sessions = Arc::new(manager(
            EagerPolicy::new(tool.name()),
            &tools,
            SessionSettings::default(),
        ));
        let state = AppState {
            sessions: Arc::clone(&sessions),
            registry: registry(&tools),
        };
        let handle = tokio::spawn(run_gateway_with_listener(listener, state));

        Self {
            addr,
            client: reqwest::Client::new(),
            sessions,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn create_session(&self) -> String {
        let response = self.client.post(self.url("/sessions")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn get_status(&self, path: &str) -> StatusCode {
        self.client.get(self.url(path)).send().await.unwrap().status()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

impl Drop for GatewayTestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
