//! Repository credentials and the HTTP client that carries them
//!
//! Key security features:
//! - Basic auth is only sent to the origin of the repository URL
//! - Redirects are followed manually so a cross-origin hop never sees the
//!   `Authorization` header, unless the repository opts in with
//!   `pass_credentials_all`
//! - TLS material (CA bundle, client identity) comes from the repository entry

use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::config::RepositoryEntry;
use crate::error::{RepoError, Result};

/// Request timeout for index downloads
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_REDIRECTS: u32 = 10;

/// Basic authentication credentials
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl BasicAuth {
    /// Credentials of a repository entry, if it has a username
    pub fn from_entry(entry: &RepositoryEntry) -> Option<Self> {
        let username = entry.username.clone()?;
        Some(Self {
            username,
            password: entry.password.clone().unwrap_or_default(),
        })
    }

    /// `Authorization` header value
    pub fn header_value(&self) -> String {
        let encoded = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            format!("{}:{}", self.username, self.password),
        );
        format!("Basic {}", encoded)
    }
}

/// Credentials bound to the origin they were configured for
/// SECURITY: Never sends credentials to another origin unless told to
#[derive(Debug, Clone)]
pub struct ScopedCredentials {
    origin: String,
    auth: Option<BasicAuth>,
    pass_to_all: bool,
}

impl ScopedCredentials {
    /// Scope the credentials of `entry` to its URL
    pub fn for_entry(entry: &RepositoryEntry) -> Self {
        Self {
            origin: entry.url.clone(),
            auth: BasicAuth::from_entry(entry),
            pass_to_all: entry.pass_credentials_all,
        }
    }


    /// Credentials to send with a request to `url`
    pub fn for_url(&self, url: &str) -> Option<&BasicAuth> {
        let auth = self.auth.as_ref()?;
        if self.pass_to_all || Self::same_origin(&self.origin, url) {
            Some(auth)
        } else {
            None
        }
    }

    /// Check if two URLs are same-origin (for redirect safety)
    pub fn same_origin(url1: &str, url2: &str) -> bool {
        let parse1 = Url::parse(url1);
        let parse2 = Url::parse(url2);

        match (parse1, parse2) {
            (Ok(u1), Ok(u2)) => {
                u1.scheme() == u2.scheme()
                    && u1.host() == u2.host()
                    && u1.port_or_known_default() == u2.port_or_known_default()
            }
            _ => false,
        }
    }
}

/// Secure HTTP client wrapper with redirect protection
pub struct SecureHttpClient {
    client: reqwest::Client,
    credentials: ScopedCredentials,
}

impl SecureHttpClient {
    /// Build a client configured with the TLS options and credentials of `entry`
    pub fn for_entry(entry: &RepositoryEntry) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            // Redirects go through `get` so the origin check runs on every hop
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("chartwell/", env!("CARGO_PKG_VERSION")));

        if let Some(ca_file) = &entry.ca_file {
            let pem = read_tls_file(ca_file)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| RepoError::InvalidConfig {
                message: format!("Invalid CA bundle {}: {}", ca_file.display(), e),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        match (&entry.cert_file, &entry.key_file) {
            (Some(cert_file), Some(key_file)) => {
                let mut pem = read_tls_file(cert_file)?;
                pem.push(b'\n');
                pem.extend(read_tls_file(key_file)?);
                let identity =
                    reqwest::Identity::from_pem(&pem).map_err(|e| RepoError::InvalidConfig {
                        message: format!(
                            "Invalid client certificate {} / key {}: {}",
                            cert_file.display(),
                            key_file.display(),
                            e
                        ),
                    })?;
                builder = builder.identity(identity);
            }
            (None, None) => {}
            _ => {
                return Err(RepoError::InvalidConfig {
                    message: format!(
                        "Repository '{}' needs both a client certificate and a key",
                        entry.name
                    ),
                });
            }
        }

        if entry.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            credentials: ScopedCredentials::for_entry(entry),
        })
    }

    /// Fetch a URL with secure redirect handling
    ///
    /// SECURITY: Credentials are only sent where [`ScopedCredentials`] allows
    pub async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut current_url = url.to_string();
        let mut redirects = 0;

        loop {
            let mut request = self.client.get(&current_url);

            match self.credentials.for_url(&current_url) {
                Some(auth) => {
                    request = request.header(reqwest::header::AUTHORIZATION, auth.header_value());
                }
                None if current_url != url => {
                    tracing::debug!(
                        "Redirected from {} to {} - credentials not forwarded",
                        url,
                        current_url
                    );
                }
                None => {}
            }

            let response = request.send().await?;
            let status = response.status();

            // Handle redirects
            if status.is_redirection() {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(RepoError::NetworkError {
                        message: format!("Too many redirects (max {})", MAX_REDIRECTS),
                    });
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| RepoError::NetworkError {
                        message: "Redirect without Location header".to_string(),
                    })?;

                current_url = resolve_redirect(&current_url, location)?;
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(RepoError::AuthRequired { url: current_url });
            }

            if !status.is_success() {
                return Err(RepoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Request to {} failed", current_url),
                });
            }

            return Ok(response);
        }
    }

    /// Fetch bytes from URL
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response.bytes().await.map_err(|e| RepoError::NetworkError {
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Resolve a `Location` header against the URL that returned it
fn resolve_redirect(current_url: &str, location: &str) -> Result<String> {
    let invalid = |e: url::ParseError| RepoError::InvalidRepositoryUrl {
        url: location.to_string(),
        reason: format!("redirect from {}: {}", current_url, e),
    };
    let base = Url::parse(current_url).map_err(invalid)?;
    Ok(base.join(location).map_err(invalid)?.to_string())
}

fn read_tls_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| RepoError::io(path, e))
}
