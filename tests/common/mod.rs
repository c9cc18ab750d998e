use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use uuid::Uuid;

use scale_api::session::{generate_jwt, Claims};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/scale-api");
        cmd.env("SCALE_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Without a provisioned database the pool stays lazy: auth and
        // routing tests still work, store-backed tests gate themselves
        // on SCALE_TEST_DB.
        if std::env::var("DATABASE_URL").is_err() {
            cmd.env("DATABASE_URL", "postgres://postgres@localhost:5432/scaledb");
        }
        let migrate = if db_tests_enabled() { "true" } else { "false" };
        cmd.env("DATABASE_RUN_MIGRATIONS", migrate);

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                // Consider server ready on any non-404 response
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Store-backed tests need a provisioned Postgres; they skip themselves
/// unless SCALE_TEST_DB is set.
pub fn db_tests_enabled() -> bool {
    std::env::var("SCALE_TEST_DB").is_ok()
}

/// A signed session for a fresh organization. The server and the test
/// process share the development JWT secret.
#[allow(dead_code)]
pub struct TestSession {
    pub token: String,
    pub organization_id: Uuid,
    pub email: String,
}

#[allow(dead_code)]
pub fn new_session(organization: &str, email: &str, role: &str) -> TestSession {
    let organization_id = Uuid::new_v4();
    let claims = Claims::new(
        organization_id,
        organization.to_string(),
        email.to_string(),
        role.to_string(),
        Uuid::new_v4(),
    );
    let token = generate_jwt(claims).expect("test token");

    TestSession {
        token,
        organization_id,
        email: email.to_string(),
    }
}
