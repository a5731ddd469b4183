//! Remote store transports.
//!
//! Both transports speak the JSON envelope from `tessera_core::envelope`:
//! either response shape decodes, and publishes always send the flat one.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use tessera_core::{envelope, ArtifactRef, RemoteConfig, RemoteError, TemplateBundle};
use tessera_sync::{writer::atomic_write, RemoteStore};

/// Build the transport described by `config`.
pub fn connect(config: &RemoteConfig) -> Result<Arc<dyn RemoteStore>> {
    match config {
        RemoteConfig::Directory { path } => Ok(Arc::new(DirectoryRemote::new(path.clone()))),
        RemoteConfig::Http { url, token_env } => {
            let token = match token_env {
                Some(var) => Some(
                    std::env::var(var)
                        .with_context(|| format!("remote token variable '{var}' is not set"))?,
                ),
                None => None,
            };
            Ok(Arc::new(HttpRemote::new(url.clone(), token)))
        }
    }
}

// ---------------------------------------------------------------------------
// Directory mirror
// ---------------------------------------------------------------------------

/// A directory of envelopes: `<root>/<collection>/<artifact>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryRemote {
    root: PathBuf,
}

impl DirectoryRemote {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path_for(&self, artifact: &ArtifactRef) -> Result<PathBuf, RemoteError> {
        artifact.validate().map_err(|e| RemoteError::Rejected {
            artifact: artifact.clone(),
            reason: e.to_string(),
        })?;
        Ok(self
            .root
            .join(&artifact.collection.0)
            .join(format!("{}.json", artifact.artifact)))
    }
}

impl RemoteStore for DirectoryRemote {
    fn fetch(&self, artifact: &ArtifactRef) -> Result<TemplateBundle, RemoteError> {
        let path = self.path_for(artifact)?;
        match std::fs::read_to_string(&path) {
            Ok(body) => envelope::decode(&body),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(RemoteError::NotFound {
                artifact: artifact.clone(),
            }),
            Err(err) => Err(RemoteError::Unavailable(format!("{}: {err}", path.display()))),
        }
    }

    fn publish(&self, artifact: &ArtifactRef, bundle: &TemplateBundle) -> Result<(), RemoteError> {
        let body = envelope::encode(bundle)?;
        atomic_write(&self.path_for(artifact)?, body.as_bytes())
            .map_err(|e| RemoteError::Unavailable(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// `GET`/`PUT {base}/collections/{collection}/templates/{artifact}`.
pub struct HttpRemote {
    base: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpRemote {
    pub fn new(base: String, token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self { base, token, agent }
    }

    fn url_for(&self, artifact: &ArtifactRef) -> String {
        format!(
            "{}/collections/{}/templates/{}",
            self.base.trim_end_matches('/'),
            artifact.collection,
            artifact.artifact
        )
    }

    fn request(&self, method: &str, artifact: &ArtifactRef) -> ureq::Request {
        let request = self.agent.request(method, &self.url_for(artifact));
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }
}

impl RemoteStore for HttpRemote {
    fn fetch(&self, artifact: &ArtifactRef) -> Result<TemplateBundle, RemoteError> {
        let response = self
            .request("GET", artifact)
            .call()
            .map_err(|e| http_error(artifact, e))?;
        let body = response
            .into_string()
            .map_err(|e| RemoteError::Unavailable(format!("reading response body: {e}")))?;
        envelope::decode(&body)
    }

    fn publish(&self, artifact: &ArtifactRef, bundle: &TemplateBundle) -> Result<(), RemoteError> {
        let body = envelope::encode(bundle)?;
        self.request("PUT", artifact)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|e| http_error(artifact, e))?;
        tracing::debug!(artifact = %artifact, "PUT accepted");
        Ok(())
    }
}

fn http_error(artifact: &ArtifactRef, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(404, _) => RemoteError::NotFound {
            artifact: artifact.clone(),
        },
        ureq::Error::Status(code, response) if (400..500).contains(&code) => RemoteError::Rejected {
            artifact: artifact.clone(),
            reason: format!("HTTP {code}: {}", response.into_string().unwrap_or_default().trim()),
        },
        ureq::Error::Status(code, _) => RemoteError::Unavailable(format!("HTTP {code}")),
        ureq::Error::Transport(transport) => RemoteError::Unavailable(transport.to_string()),
    }
}
