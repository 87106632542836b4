// ListenBrainz submission
// API Documentation: https://listenbrainz.readthedocs.io/

use super::error::SubmitError;
use super::traits::Transport;
use crate::config::Config;
use crate::listen::Listen;
use attohttpc::header::{
    HeaderName, ACCEPT_ENCODING, AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE,
    USER_AGENT,
};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;

pub const CLIENT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Upper bound on the response bytes read back for logging
const RESPONSE_LIMIT: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenType {
    Single,
    Import,
}

impl ListenType {
    fn for_batch(len: usize) -> Self {
        if len == 1 {
            Self::Single
        } else {
            Self::Import
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitListens<'a> {
    pub listen_type: ListenType,
    pub payload: Vec<ListenPayload<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ListenPayload<'a> {
    pub listened_at: i64,
    pub track_metadata: TrackMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct TrackMetadata<'a> {
    pub artist_name: &'a str,
    pub track_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<AdditionalInfo<'a>>,
}

/// Optional extras of a listen. `tracknumber` is sent alongside `recording_mbid`
/// since the ListenBrainz API accepts it there.
#[derive(Debug, Serialize)]
pub struct AdditionalInfo<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_mbid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracknumber: Option<&'a str>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl<'a> SubmitListens<'a> {
    pub fn from_batch(batch: &'a [Listen]) -> Self {
        let payload = batch
            .iter()
            .map(|listen| {
                let recording_mbid = non_empty(&listen.recording_id);
                let tracknumber = non_empty(&listen.track_number);
                let additional_info = (recording_mbid.is_some() || tracknumber.is_some())
                    .then_some(AdditionalInfo {
                        recording_mbid,
                        tracknumber,
                    });

                ListenPayload {
                    listened_at: listen.listened_at.timestamp(),
                    track_metadata: TrackMetadata {
                        artist_name: &listen.artist,
                        track_name: &listen.title,
                        release_name: non_empty(&listen.album),
                        additional_info,
                    },
                }
            })
            .collect();

        Self {
            listen_type: ListenType::for_batch(batch.len()),
            payload,
        }
    }
}

/// Encode a batch of listens as a submit-listens JSON body
pub fn build_payload(batch: &[Listen]) -> Result<Vec<u8>, SubmitError> {
    let payload = serde_json::to_vec(&SubmitListens::from_batch(batch))?;
    log::debug!("Payload: {}", String::from_utf8_lossy(&payload));
    Ok(payload)
}

/// Where and as whom listens are submitted
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub url: String,
    pub token: String,
}

impl Endpoint {
    pub fn from_config(config: &Config) -> Self {
        let lb = &config.listenbrainz;
        Self {
            name: lb.name.clone(),
            url: lb.submit_url(),
            token: lb.token.trim().to_string(),
        }
    }
}

/// A fully prepared submission: target, headers and body
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub url: String,
    pub headers: Vec<(HeaderName, String)>,
    pub body: Vec<u8>,
}

impl SubmitRequest {
    pub fn new(endpoint: &Endpoint, batch: &[Listen]) -> Result<Self, SubmitError> {
        let body = build_payload(batch)?;
        let headers = vec![
            (AUTHORIZATION, format!("Token {}", endpoint.token)),
            (USER_AGENT, CLIENT_USER_AGENT.to_string()),
            (CONTENT_TYPE, "application/json".to_string()),
            (CONNECTION, "close".to_string()),
            (ACCEPT_ENCODING, "identity".to_string()),
            (CONTENT_LENGTH, body.len().to_string()),
        ];

        Ok(Self {
            url: endpoint.url.clone(),
            headers,
            body,
        })
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// HTTPS transport over attohttpc
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &SubmitRequest) -> Result<u16, SubmitError> {
        let mut builder = attohttpc::RequestBuilder::try_new(attohttpc::Method::POST, &request.url)?
            .connect_timeout(self.timeout)
            .read_timeout(self.timeout)
            .allow_compression(false);

        for (name, value) in &request.headers {
            builder = builder.try_header(name, value.as_str())?;
        }

        let response = builder.bytes(request.body.as_slice()).send()?;
        let (status, _headers, reader) = response.split();

        let mut body = Vec::new();
        match reader.take(RESPONSE_LIMIT).read_to_end(&mut body) {
            Ok(_) => log::debug!("Response: {} {}", status, String::from_utf8_lossy(&body)),
            Err(e) => log::debug!("Response: {} (body unreadable: {})", status, e),
        }

        Ok(status.as_u16())
    }
}
