//! Forward a day's collected tweets to the archive server.
//!
//! Reads `<tweets_dir>/<YYYY-MM-DD>.json` (a JSON array) and POSTs it to
//! `<api_url>/api/tweets/upload`, authenticated with an `X-API-Key` header.
use chrono::NaiveDate;
use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use xscribe_http::{Auth, HttpClient, HttpError, RequestOpts};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const UPLOAD_PATH: &str = "api/tweets/upload";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay is not configured: {0}")]
    Config(String),
    #[error("server rejected upload: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not valid JSON: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    MissingFile,
    /// The file is not an array, or the array is empty.
    Empty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub new: u64,
    #[serde(default)]
    pub duplicates: u64,
    #[serde(default)]
    pub errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Skipped { file: PathBuf, cause: SkipCause },
    Uploaded(UploadStats),
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    date: String,
    source_file: String,
    tweets: &'a [Value],
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<UploadStats>,
    #[serde(default)]
    error: Option<String>,
}

pub struct TweetRelay {
    http: HttpClient,
    api_key: HeaderValue,
    tweets_dir: PathBuf,
}

impl TweetRelay {
    pub fn new(
        api_url: &str,
        api_key: &str,
        tweets_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let api_url = api_url.trim();
        let api_key = api_key.trim();
        if api_url.is_empty() {
            return Err(RelayError::Config(
                "api url is empty: set FLASK_API_URL or `upload.api_url`".into(),
            ));
        }
        if api_key.is_empty() {
            return Err(RelayError::Config(
                "api key is empty: set FLASK_API_KEY or `upload.api_key`".into(),
            ));
        }

        let mut api_key = HeaderValue::from_str(api_key)
            .map_err(|e| RelayError::Config(format!("api key is not a valid header value: {e}")))?;
        api_key.set_sensitive(true);

        // Url::join drops the last path segment unless the base ends with '/'.
        let base = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };
        let http = HttpClient::builder(&base).timeout(timeout).build()?;

        Ok(Self {
            http,
            api_key,
            tweets_dir: tweets_dir.into(),
        })
    }

    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.tweets_dir.join(file_name(date))
    }

    /// Upload the tweets collected on `date`, if there are any.
    pub async fn upload_for(&self, date: NaiveDate) -> Result<RelayOutcome, RelayError> {
        let path = self.file_for(date);
        let tweets = match read_tweets(&path).await? {
            Ok(tweets) => tweets,
            Err(cause) => {
                tracing::info!(file = %path.display(), ?cause, "relay.skipped");
                return Ok(RelayOutcome::Skipped { file: path, cause });
            }
        };

        tracing::info!(
            file = %path.display(),
            tweets = tweets.len(),
            target = %self.http.base(),
            "relay.upload.start"
        );

        let request = UploadRequest {
            date: date.format("%Y-%m-%d").to_string(),
            source_file: file_name(date),
            tweets: &tweets,
        };
        let response: UploadResponse = self
            .http
            .post_json(
                UPLOAD_PATH,
                &request,
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: HeaderName::from_static("x-api-key"),
                        value: self.api_key.clone(),
                    }),
                    ..Default::default()
                },
            )
            .await?;

        if !response.success {
            let reason = response
                .error
                .unwrap_or_else(|| "server reported failure without a message".into());
            tracing::error!(error = %reason, "relay.upload.rejected");
            return Err(RelayError::Rejected(reason));
        }

        let stats = response.data.unwrap_or_default();
        tracing::info!(
            total = stats.total,
            new = stats.new,
            duplicates = stats.duplicates,
            errors = stats.errors,
            "relay.upload.ok"
        );
        Ok(RelayOutcome::Uploaded(stats))
    }
}

fn file_name(date: NaiveDate) -> String {
    format!("{}.json", date.format("%Y-%m-%d"))
}

async fn read_tweets(path: &Path) -> Result<Result<Vec<Value>, SkipCause>, RelayError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Err(SkipCause::MissingFile)),
        Err(source) => {
            return Err(RelayError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| RelayError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(tweets) if !tweets.is_empty() => Ok(Ok(tweets)),
        _ => Ok(Err(SkipCause::Empty)),
    }
}
