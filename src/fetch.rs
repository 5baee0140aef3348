use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::settings::Settings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Client(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("invalid header {0}")]
    InvalidHeader(String),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub headers: Vec<(String, String)>,
    pub follow_redirects: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl FetchOptions {
    /// Options for the group listing page: browser-like accept headers.
    pub fn listing(settings: &Settings) -> Self {
        FetchOptions {
            headers: vec![
                (
                    "Accept".into(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                        .into(),
                ),
                ("Accept-Language".into(), "en-US,en;q=0.5".into()),
            ],
            ..Self::plain(settings)
        }
    }

    pub fn plain(settings: &Settings) -> Self {
        FetchOptions {
            headers: Vec::new(),
            follow_redirects: settings.follow_redirects,
            verify_tls: settings.verify_tls,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Source of raw markup. Retries, if any, belong to the implementation.
pub trait Fetcher {
    fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Self {
        HttpFetcher {
            user_agent: settings.user_agent.clone(),
        }
    }

    fn client(&self, opts: &FetchOptions) -> Result<Client, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &opts.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }

        let redirect = if opts.follow_redirects {
            Policy::limited(10)
        } else {
            Policy::none()
        };

        Ok(Client::builder()
            .user_agent(&self.user_agent)
            .default_headers(headers)
            .redirect(redirect)
            .danger_accept_invalid_certs(!opts.verify_tls)
            .timeout(opts.timeout)
            .build()?)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, opts: &FetchOptions) -> Result<String, FetchError> {
        let client = self.client(opts)?;
        debug!("GET {}", url);
        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

/// Wrap `target` for the rendering proxy when an API key is configured.
/// Returns the URL to fetch plus the options to fetch it with.
pub fn detail_request(settings: &Settings, target: &str) -> Result<(String, FetchOptions), FetchError> {
    let mut opts = FetchOptions::plain(settings);
    let Some(key) = settings.render_api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Ok((target.to_string(), opts));
    };

    let mut proxied = Url::parse(&settings.render_endpoint)?;
    proxied
        .query_pairs_mut()
        .append_pair("api_key", key)
        .append_pair("url", target)
        .append_pair("render", "true");
    opts.timeout = Duration::from_secs(settings.render_timeout_secs);
    info!("Fetching {} through rendering proxy", target);
    Ok((proxied.into(), opts))
}
