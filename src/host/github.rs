//! GitHub REST driver
//!
//! Talks to GitHub or GitHub Enterprise through the v3 REST API:
//!
//! - contents API to read, write and delete files (base64 payloads);
//! - git refs API to read branch heads and create branches;
//! - pulls API to open pull requests.
//!
//! Requests are blocking and made with a shared `ureq` agent. Nothing is
//! retried; a failed call surfaces as an [`Error::Http`] carrying the status
//! code and the message GitHub returned.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{CommitRequest, FileContent, GitHost, HostOptions, PullRequest, PullRequestInput};
use crate::error::{Error, Result};

/// API root of github.com
pub const DEFAULT_API_ENDPOINT: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("yaml-updater/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: String,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

/// GitHub host driver
pub struct GitHubHost {
    base: Url,
    authorization: Option<String>,
    agent: ureq::Agent,
}

impl GitHubHost {
    /// Create a driver from connection options.
    ///
    /// Fails with [`Error::Driver`] when the endpoint is not a usable URL or
    /// the TLS connector cannot be built.
    pub fn new(options: &HostOptions) -> Result<Self> {
        let endpoint = options
            .api_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_API_ENDPOINT);
        let base = Url::parse(endpoint).map_err(|e| Error::Driver {
            message: format!("invalid api endpoint '{}': {}", endpoint, e),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::Driver {
                message: format!("invalid api endpoint '{}': not a base URL", endpoint),
            });
        }

        let mut builder = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(60))
            .user_agent(USER_AGENT);

        if options.insecure {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| Error::Driver {
                    message: format!("failed to build insecure TLS connector: {}", e),
                })?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        Ok(Self {
            base,
            authorization: authorization_header(
                options.username.as_deref(),
                options.auth_token.as_deref(),
            ),
            agent: builder.build(),
        })
    }

    /// Builds `<base>/repos/<repo>/<segments...>` with each part escaped.
    fn repo_url(&self, repo: &str, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("repos");
            path.extend(repo.split('/').filter(|s| !s.is_empty()));
            path.extend(segments.iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty()));
        }
        url
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        let request = self
            .agent
            .request_url(method, url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");
        match &self.authorization {
            Some(value) => request.set("Authorization", value),
            None => request,
        }
    }

    fn send(&self, method: &str, url: &Url, body: Option<serde_json::Value>) -> Result<ureq::Response> {
        debug!("{} {}", method, url);
        let request = self.request(method, url);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        result.map_err(|e| http_error(url, e))
    }
}

fn authorization_header(username: Option<&str>, token: Option<&str>) -> Option<String> {
    let token = token.filter(|t| !t.trim().is_empty())?;
    match username.filter(|u| !u.trim().is_empty()) {
        Some(username) => Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", username, token))
        )),
        None => Some(format!("Bearer {}", token)),
    }
}

fn http_error(url: &Url, error: ureq::Error) -> Error {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| {
                    if body.trim().is_empty() {
                        format!("HTTP {}", code)
                    } else {
                        format!("HTTP {}: {}", code, body.trim())
                    }
                });
            Error::Http {
                url: url.to_string(),
                status: Some(code),
                message,
            }
        }
        other => Error::Http {
            url: url.to_string(),
            status: None,
            message: other.to_string(),
        },
    }
}

fn read_json<T: serde::de::DeserializeOwned>(url: &Url, response: ureq::Response) -> Result<T> {
    response.into_json().map_err(|e| Error::Http {
        url: url.to_string(),
        status: None,
        message: format!("failed to parse response: {}", e),
    })
}

/// Decodes the base64 payload of the contents API, which GitHub wraps at
/// 60 columns.
fn decode_content(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| Error::host(format!("invalid file content encoding: {}", e)))
}

fn commit_body(request: &CommitRequest) -> serde_json::Value {
    let mut body = json!({
        "message": request.message,
        "branch": request.branch,
    });
    if let Some(content) = &request.content {
        body["content"] = json!(STANDARD.encode(content));
    }
    if let Some(sha) = &request.previous_sha {
        body["sha"] = json!(sha);
    }
    if let Some(signature) = &request.signature {
        let identity = json!({ "name": signature.name, "email": signature.email });
        body["committer"] = identity.clone();
        body["author"] = identity;
    }
    body
}

impl GitHost for GitHubHost {
    fn get_file(&self, repo: &str, path: &str, branch: &str) -> Result<FileContent> {
        let mut url = self.repo_url(repo, &["contents", path]);
        url.query_pairs_mut().append_pair("ref", branch);

        let response = match self.send("GET", &url, None) {
            Err(e) if e.is_not_found() => {
                return Err(Error::NotFound {
                    repo: repo.to_string(),
                    path: path.to_string(),
                    branch: branch.to_string(),
                })
            }
            other => other?,
        };
        let contents: ContentsResponse = read_json(&url, response)?;
        let content = match contents.content {
            Some(encoded) => decode_content(&encoded)?,
            None => {
                return Err(Error::host(format!(
                    "{} in repo {} is not a file",
                    path, repo
                )))
            }
        };
        Ok(FileContent {
            content,
            sha: contents.sha,
        })
    }

    fn branch_head(&self, repo: &str, branch: &str) -> Result<String> {
        let url = self.repo_url(repo, &["git", "ref", "heads", branch]);
        let response = self.send("GET", &url, None)?;
        let reference: RefResponse = read_json(&url, response)?;
        Ok(reference.object.sha)
    }

    fn create_branch(&self, repo: &str, name: &str, sha: &str) -> Result<()> {
        let url = self.repo_url(repo, &["git", "refs"]);
        let body = json!({ "ref": format!("refs/heads/{}", name), "sha": sha });
        self.send("POST", &url, Some(body))?;
        Ok(())
    }

    fn commit_file(&self, request: &CommitRequest) -> Result<()> {
        let url = self.repo_url(&request.repo, &["contents", &request.path]);
        let method = if request.content.is_some() { "PUT" } else { "DELETE" };
        self.send(method, &url, Some(commit_body(request)))?;
        Ok(())
    }

    fn open_pull_request(&self, repo: &str, input: &PullRequestInput) -> Result<PullRequest> {
        let url = self.repo_url(repo, &["pulls"]);
        let body = json!({
            "title": input.title,
            "body": input.body,
            "head": input.head,
            "base": input.base,
        });
        let response = self.send("POST", &url, Some(body))?;
        let pull: PullResponse = read_json(&url, response)?;
        Ok(PullRequest {
            number: pull.number,
            link: pull.html_url,
        })
    }
}
