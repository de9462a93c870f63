//! Test server management.
//!
//! Spawns and manages nirmaand instances for integration testing.

use sqlx::SqlitePool;
use std::process::{Child, Command};
use tempfile::TempDir;
use std::time::Duration;
use tokio::time::sleep;

/// Users seeded into every test server: `(id, api_key, api_secret)`.
pub const ALICE: (&str, &str, &str) = ("alice@nirmaan.test", "alice-key", "alice-secret");
pub const BOB: (&str, &str, &str) = ("bob@nirmaan.test", "bob-key", "bob-secret");
pub const LEAD: (&str, &str, &str) = ("lead@nirmaan.test", "lead-key", "lead-secret");

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: TempDir,
}

impl TestServer {
    /// Spawn a new test server listening on `port`.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        let data_dir = tempfile::Builder::new()
            .prefix(&format!("nirmaand-test-{port}-"))
            .tempdir()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test"
listen = "127.0.0.1:{port}"
metrics_port = 0

[database]
path = "{dir}/test.db"

[chat]
default_page_size = 3
max_page_size = 10

[[roles]]
name = "Site Engineer"
grants = [
    {{ doctype = "Projects", ptypes = ["read"] }},
    {{ doctype = "Project Discussion Message", ptypes = ["read", "create"] }},
    {{ doctype = "File", ptypes = ["read"] }},
]

[[roles]]
name = "Procurement Lead"
grants = [
    {{ doctype = "Projects", ptypes = ["read"] }},
    {{ doctype = "Procurement Orders", ptypes = ["read", "delete"] }},
    {{ doctype = "Procurement Requests", ptypes = ["read", "delete"] }},
]

[[users]]
id = "{alice}"
full_name = "Alice Rao"
api_key = "{alice_key}"
api_secret = "{alice_secret}"
roles = ["Site Engineer"]

[[users]]
id = "{bob}"
full_name = "Bob Iyer"
api_key = "{bob_key}"
api_secret = "{bob_secret}"
roles = ["Site Engineer"]

[[users]]
id = "{lead}"
api_key = "{lead_key}"
api_secret = "{lead_secret}"
roles = ["Procurement Lead"]

[[projects]]
name = "PROJ-1"
project_name = "Tower A"
members = ["{alice}", "{lead}"]

[[projects]]
name = "PROJ-2"
members = ["{bob}"]
"#,
            port = port,
            dir = data_dir.path().display(),
            alice = ALICE.0,
            alice_key = ALICE.1,
            alice_secret = ALICE.2,
            bob = BOB.0,
            bob_key = BOB.1,
            bob_secret = BOB.2,
            lead = LEAD.0,
            lead_key = LEAD.1,
            lead_secret = LEAD.2,
        );

        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_nirmaand"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };

        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the health endpoint answers.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        let url = format!("{}/api/health", self.base_url());
        for _ in 0..50 {
            if let Ok(resp) = reqwest::get(&url).await
                && resp.status().is_success()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Base URL of the API.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Client authenticated as one of the seeded users.
    pub fn client(&self, user: (&str, &str, &str)) -> super::client::ApiClient {
        super::client::ApiClient::new(self.base_url(), Some((user.1, user.2)))
    }

    /// Client sending no credentials.
    pub fn guest(&self) -> super::client::ApiClient {
        super::client::ApiClient::new(self.base_url(), None)
    }

    /// Direct connection to the server's database, for fixtures.
    pub async fn pool(&self) -> anyhow::Result<SqlitePool> {
        let url = format!("sqlite://{}/test.db", self.data_dir.path().display());
        Ok(SqlitePool::connect(&url).await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
