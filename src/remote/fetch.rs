//! Network fetch over blocking HTTP

use crate::core::error::{RelError, RelResult, RemoteError};
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Retrieves remote files. Failures are terminal; nothing is retried.
pub trait Fetcher: Send + Sync {
  fn fetch_text(&self, url: &str) -> RelResult<String>;

  fn fetch_bytes(&self, url: &str) -> RelResult<Vec<u8>>;
}

/// `Fetcher` backed by ureq
pub struct HttpFetcher {
  agent: ureq::Agent,
}

impl HttpFetcher {
  pub fn new() -> Self {
    let agent = ureq::AgentBuilder::new()
      .timeout_connect(Duration::from_secs(10))
      .timeout_read(Duration::from_secs(60))
      .user_agent(concat!("relman/", env!("CARGO_PKG_VERSION")))
      .build();
    Self { agent }
  }

  fn get(&self, url: &str) -> RelResult<ureq::Response> {
    debug!(%url, "fetching");
    let response = self.agent.get(url).call()?;
    if !(200..300).contains(&response.status()) {
      return Err(RelError::Remote(RemoteError::Http {
        url: url.to_string(),
        reason: format!("HTTP {}", response.status()),
      }));
    }
    Ok(response)
  }
}

impl Default for HttpFetcher {
  fn default() -> Self {
    Self::new()
  }
}

impl Fetcher for HttpFetcher {
  fn fetch_text(&self, url: &str) -> RelResult<String> {
    self.get(url)?.into_string().map_err(|e| {
      RelError::Remote(RemoteError::Http {
        url: url.to_string(),
        reason: format!("failed to read response: {}", e),
      })
    })
  }

  fn fetch_bytes(&self, url: &str) -> RelResult<Vec<u8>> {
    let mut data = Vec::new();
    self.get(url)?.into_reader().read_to_end(&mut data).map_err(|e| {
      RelError::Remote(RemoteError::Http {
        url: url.to_string(),
        reason: format!("failed to read response: {}", e),
      })
    })?;
    Ok(data)
  }
}
