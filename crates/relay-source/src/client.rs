use std::time::Duration;

use relay_types::{CheckpointPosition, EventBatch, EventSource, SourceError};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use crate::error::SourceBuildError;
use crate::wire::{decode_batch, decode_tip};

/// Connection settings for [`HttpEventSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Gateway root, e.g. `http://namenode-gw:8081`. A trailing `/` is ignored.
    pub base_url: String,
    /// Added to the poll duration to form the HTTP timeout of a poll, so a
    /// gateway that holds the request for the full wait is not cut off.
    pub grace: Duration,
    /// HTTP timeout of the tip lookup made when opening at the tip.
    pub open_timeout: Duration,
}

impl SourceSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            grace: Duration::from_secs(2),
            open_timeout: Duration::from_secs(10),
        }
    }

    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// Read position inside an open gateway stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStream {
    after: i64,
}

impl HttpStream {
    /// The txid the next poll asks for events after.
    pub fn after(&self) -> i64 {
        self.after
    }
}

/// [`EventSource`] backed by the notification gateway's HTTP API.
///
/// Uses a blocking client; call it from a blocking thread when inside an
/// async runtime.
pub struct HttpEventSource {
    client: Client,
    base_url: String,
    settings: SourceSettings,
}

impl HttpEventSource {
    /// # Errors
    ///
    /// Returns `SourceBuildError` if the base URL is empty or the HTTP client
    /// cannot be constructed.
    pub fn new(settings: SourceSettings) -> Result<Self, SourceBuildError> {
        let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SourceBuildError::EmptyBaseUrl);
        }
        let client = Client::builder()
            .user_agent(concat!("inotify-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    fn fetch_tip(&self) -> Result<i64, SourceError> {
        let url = format!("{}/v1/inotify/tip", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.settings.open_timeout)
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(SourceError::Transient(format!("tip lookup returned {status}")));
        }
        if status != StatusCode::OK {
            return Err(SourceError::Protocol(format!(
                "unexpected status {status} from tip lookup"
            )));
        }
        decode_tip(&read_body(resp)?)
    }
}

impl std::fmt::Debug for HttpEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEventSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl EventSource for HttpEventSource {
    type Stream = HttpStream;

    fn open_stream(&mut self, position: CheckpointPosition) -> Result<HttpStream, SourceError> {
        let after = match position {
            CheckpointPosition::After(txid) => txid,
            CheckpointPosition::Tip => {
                let tip = self.fetch_tip()?;
                tracing::debug!(tip, "opened notification stream at current tip");
                tip
            }
        };
        Ok(HttpStream { after })
    }

    fn poll(
        &mut self,
        stream: &mut HttpStream,
        timeout: Duration,
    ) -> Result<Option<EventBatch>, SourceError> {
        let url = format!("{}/v1/inotify/events", self.base_url);
        let wait_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let resp = self
            .client
            .get(&url)
            .query(&[("after", stream.after), ("waitMs", wait_ms)])
            .timeout(timeout + self.settings.grace)
            .send()
            .map_err(transport_error)?;

        let status = resp.status();
        match status {
            StatusCode::OK => {
                let batch = decode_batch(&read_body(resp)?)?;
                tracing::debug!(
                    after = stream.after,
                    txid = batch.txid,
                    events = batch.events.len(),
                    "received event batch"
                );
                stream.after = batch.txid;
                Ok(Some(batch))
            }
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::GONE => {
                let detail = resp.text().unwrap_or_default();
                Err(SourceError::Gap(format!(
                    "no history after txid {}: {}",
                    stream.after,
                    detail.trim()
                )))
            }
            s if s.is_server_error() => Err(SourceError::Transient(format!("gateway returned {s}"))),
            s => Err(SourceError::Protocol(format!(
                "unexpected status {s} from events endpoint"
            ))),
        }
    }
}

fn read_body(resp: Response) -> Result<Vec<u8>, SourceError> {
    resp.bytes()
        .map(|b| b.to_vec())
        .map_err(|e| SourceError::Transient(format!("failed to read response body: {e}")))
}

fn transport_error(e: reqwest::Error) -> SourceError {
    if e.is_builder() {
        SourceError::Protocol(format!("invalid gateway request: {e}"))
    } else {
        SourceError::Transient(e.to_string())
    }
}
