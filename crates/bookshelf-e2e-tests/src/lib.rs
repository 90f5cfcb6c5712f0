pub mod rest;

use std::path::Path;

use anyhow::{Result, anyhow};
use bookshelf_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::{debug, error};

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, std::time::Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = tempfile::Builder::new()
        .prefix(&format!("{}_", test_name))
        .tempdir_in(base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let args = &[
        "bookshelf-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

pub fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    test_config(test_name, &std::env::temp_dir())
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    let url = format!("http://127.0.0.1:{}/", config.port).parse()?;
    Ok(url)
}

/// Running server, stopped when dropped
pub struct TestServer {
    pub client: reqwest::Client,
    pub base_url: Url,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> Url {
        extend_url(&self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn launch_env(args: ServerConfig) -> Result<TestServer> {
    let base_url = base_url(&args)?;
    let state = bookshelf_server::run::build_state(&args).await?;
    let (sender, receiver) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = receiver.await;
    };
    tokio::spawn(async move {
        if let Err(e) = bookshelf_server::run::run_graceful_with_state(args, state, shutdown).await
        {
            error!("Server failed: {e}");
        }
    });

    // Redirects are part of the behaviour under test
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let health_url = extend_url(&base_url, "health");
    let mut attempts = 50;
    loop {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => break,
            _ if attempts > 0 => {
                attempts -= 1;
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            Ok(response) => return Err(anyhow!("Server not healthy: {}", response.status())),
            Err(e) => return Err(e.into()),
        }
    }
    debug!("Test server ready at {base_url}");

    Ok(TestServer {
        client,
        base_url,
        shutdown: Some(sender),
    })
}

pub fn extend_url(url: &Url, segment: impl ToString) -> Url {
    let mut url = url.clone();
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}/{}", path, segment.to_string().trim_start_matches('/')));
    url
}
