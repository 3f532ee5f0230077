use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::thingsboard::config::{expand_env_vars, ServerConfig, TbAuth};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const API_PREFIX: &str = "api";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
}

/// Base HTTP client for the ThingsBoard REST API.
/// Resolves credentials into a JWT and builds authenticated requests.
#[derive(Debug, Clone)]
pub struct BaseClient {
    pub client: reqwest::Client,
    pub config: ServerConfig,
    jwt: Arc<Mutex<Option<String>>>,
}

impl BaseClient {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let timeout = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let mut client_builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .use_rustls_tls();

        // Config proxy takes priority over the environment
        if let Some(proxy_url) = &config.proxy {
            let proxy_url = expand_env_vars(proxy_url)?;
            let proxy = reqwest::Proxy::all(&proxy_url)
                .with_context(|| format!("Invalid proxy URL: {proxy_url}"))?;
            client_builder = client_builder.proxy(proxy);
            info!("🔀 Using proxy from config: {proxy_url}");
        } else {
            if let Ok(http_proxy) =
                std::env::var("HTTP_PROXY").or_else(|_| std::env::var("http_proxy"))
            {
                let proxy = reqwest::Proxy::http(&http_proxy)
                    .with_context(|| format!("Invalid HTTP_PROXY: {http_proxy}"))?;
                client_builder = client_builder.proxy(proxy);
                info!("🔀 Using proxy from HTTP_PROXY: {http_proxy}");
            }
            if let Ok(https_proxy) =
                std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("https_proxy"))
            {
                let proxy = reqwest::Proxy::https(&https_proxy)
                    .with_context(|| format!("Invalid HTTPS_PROXY: {https_proxy}"))?;
                client_builder = client_builder.proxy(proxy);
                info!("🔀 Using proxy from HTTPS_PROXY: {https_proxy}");
            }
        }

        let client = client_builder.build()?;
        Ok(Self {
            client,
            config,
            jwt: Arc::new(Mutex::new(None)),
        })
    }

    fn url(&self, endpoint: &str) -> Result<Url> {
        let mut base_endpoint = self.config.endpoint.clone();
        if !base_endpoint.ends_with('/') {
            base_endpoint.push('/');
        }
        let base_url = Url::parse(&base_endpoint)?;
        Ok(base_url.join(&format!("{API_PREFIX}/{endpoint}"))?)
    }

    /// Build a request against `api/{endpoint}` carrying the `X-Authorization` header.
    pub async fn base_api(&self, method: Method, endpoint: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.url(endpoint)?;
        debug!("🔗 Request URL: {url}");
        let token = self.jwt().await?;
        Ok(self
            .client
            .request(method, url)
            .header("X-Authorization", format!("Bearer {token}")))
    }

    async fn jwt(&self) -> Result<String> {
        match &self.config.auth {
            TbAuth::Basic(auth) => {
                let mut cached = self.jwt.lock().await;
                if let Some(token) = cached.as_ref() {
                    return Ok(token.clone());
                }
                let username = expand_env_vars(&auth.username)?;
                let password = expand_env_vars(&auth.password)?;
                info!("🔑 Basic Auth: {username}");
                let response: LoginResponse = self
                    .client
                    .post(self.url("auth/login")?)
                    .json(&json!({ "username": username, "password": password }))
                    .send()
                    .await?
                    .error_for_status()
                    .context("Login failed")?
                    .json()
                    .await?;
                *cached = Some(response.token.clone());
                Ok(response.token)
            }
            TbAuth::Token(token) => {
                info!("🔑 Token Auth: {:?}", token.cmd);
                if let Some(cmd) = &token.cmd {
                    let output = std::process::Command::new("sh")
                        .arg("-c")
                        .arg(cmd)
                        .output()
                        .context("Failed to run token helper command")?;

                    if !output.status.success() {
                        let stderr = String::from_utf8_lossy(&output.stderr);
                        let stdout = String::from_utf8_lossy(&output.stdout);
                        return Err(anyhow::anyhow!(
                            "Token helper command failed with exit code {:?}\nstdout: {}\nstderr: {}",
                            output.status.code(),
                            stdout,
                            stderr
                        ));
                    }

                    Ok(String::from_utf8(output.stdout)
                        .context("Token helper returned invalid UTF-8")?
                        .trim()
                        .replace('"', ""))
                } else if let Some(token) = &token.token {
                    expand_env_vars(token.trim())
                } else {
                    Err(anyhow::anyhow!("Token not found"))
                }
            }
        }
    }
}

impl TryFrom<&ServerConfig> for BaseClient {
    type Error = anyhow::Error;

    fn try_from(config: &ServerConfig) -> Result<Self, Self::Error> {
        Self::new(config.clone())
    }
}
