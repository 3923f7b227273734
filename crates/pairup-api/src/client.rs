// REST client for the chat-matching service.
//
// Every call carries the configured device identity in `X-Device-ID`.
// Failures of any kind surface as `Error::Request` with a single
// human-readable message; this layer never retries.

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::identity::{DeviceIdentity, IdentitySlot};
use crate::models::{
    ChatCompletion, KarmaStatus, ProfileUpdate, ReportReason, ReportReceipt, ReportRequest,
    UserProfile, VerificationResult,
};
use crate::transport::TransportConfig;

/// Header carrying the device identity on every request.
pub const DEVICE_ID_HEADER: &str = "X-Device-ID";

/// Fallback message for REST failures without a usable `detail`.
pub const REQUEST_FAILED: &str = "Request failed";

/// Fallback message for a failed selfie upload.
pub const VERIFICATION_FAILED: &str = "Verification failed";

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<Value>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the REST endpoints under `/api/`.
///
/// Call [`configure`](Self::configure) before anything else; every
/// operation fails with [`Error::NotConfigured`] until an identity is set.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    identity: IdentitySlot,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base origin (e.g. `http://localhost:8000`) and a
    /// transport config.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.http_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            identity: IdentitySlot::new(),
        }
    }

    /// Share an identity slot with another component (the connection
    /// manager) so both always use the same identity.
    pub fn with_identity_slot(mut self, identity: IdentitySlot) -> Self {
        self.identity = identity;
        self
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// Set the device identity. Must complete before any other call.
    pub fn configure(&self, identity: DeviceIdentity) -> Result<(), Error> {
        self.identity.configure(identity)
    }

    pub fn identity(&self) -> Result<&DeviceIdentity, Error> {
        self.identity.get()
    }

    pub fn identity_slot(&self) -> &IdentitySlot {
        &self.identity
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Generic request ──────────────────────────────────────────────

    /// Send a JSON request to `endpoint` (e.g. `/api/auth/me`) and decode
    /// the response body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let builder = self.json_request(method, endpoint, &[], body)?;
        send(builder, REQUEST_FAILED).await
    }

    // ── Auth endpoints ───────────────────────────────────────────────

    /// Register this device (or fetch the existing session). The identity
    /// travels in the header; the body is an empty object.
    pub async fn register(&self) -> Result<UserProfile, Error> {
        let body = Value::Object(serde_json::Map::new());
        self.request(Method::POST, "/api/auth/register", Some(&body))
            .await
    }

    /// Upload a selfie for verification as multipart field `image`.
    ///
    /// The JSON content type is deliberately not set: reqwest supplies the
    /// multipart boundary header.
    pub async fn verify_gender(
        &self,
        image: Vec<u8>,
        file_name: &str,
    ) -> Result<VerificationResult, Error> {
        let part = Part::bytes(image)
            .file_name(file_name.to_owned())
            .mime_str(image_mime(file_name))
            .map_err(|e| request_failure(VERIFICATION_FAILED, e))?;
        let form = Form::new().part("image", part);

        let url = self.url("/api/auth/verify-gender")?;
        debug!("POST {url} (multipart)");

        let builder = self.scoped(Method::POST, url)?.multipart(form);
        send(builder, VERIFICATION_FAILED).await
    }

    pub async fn update_profile(&self, nickname: &str, bio: &str) -> Result<UserProfile, Error> {
        let body = serde_json::to_value(ProfileUpdate {
            nickname: nickname.to_owned(),
            bio: bio.to_owned(),
        })
        .map_err(|e| encode_failure(&e))?;
        self.request(Method::PUT, "/api/auth/profile", Some(&body))
            .await
    }

    pub async fn me(&self) -> Result<UserProfile, Error> {
        self.request(Method::GET, "/api/auth/me", None).await
    }

    // ── Report / karma endpoints ─────────────────────────────────────

    /// Report another device. The wire reason is `"<code>: <details>"`.
    pub async fn submit_report(
        &self,
        reported_device_id: &str,
        reason: ReportReason,
        details: &str,
    ) -> Result<ReportReceipt, Error> {
        let body = serde_json::to_value(ReportRequest {
            reported_device_id,
            reason: reason.compose(details),
        })
        .map_err(|e| encode_failure(&e))?;
        self.request(Method::POST, "/api/reports/submit", Some(&body))
            .await
    }

    /// Mark the current chat as completed without reports.
    pub async fn complete_chat(&self) -> Result<ChatCompletion, Error> {
        let id = self.identity()?.as_str().to_owned();
        let builder = self.json_request(
            Method::POST,
            "/api/reports/chat-complete",
            &[("device_id", id.as_str())],
            None,
        )?;
        send(builder, REQUEST_FAILED).await
    }

    pub async fn karma(&self) -> Result<KarmaStatus, Error> {
        let id = self.identity()?.as_str().to_owned();
        let builder = self.json_request(
            Method::GET,
            "/api/reports/karma",
            &[("device_id", id.as_str())],
            None,
        )?;
        send(builder, REQUEST_FAILED).await
    }

    // ── Request building ─────────────────────────────────────────────

    /// Join an endpoint path onto the base URL, keeping any path prefix
    /// the base carries (e.g. a reverse-proxy mount point).
    fn url(&self, endpoint: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(endpoint.trim_start_matches('/'))?)
    }

    /// Start a request carrying the identity header. Fails fast when the
    /// identity is not configured.
    fn scoped(&self, method: Method, url: Url) -> Result<RequestBuilder, Error> {
        let identity = self.identity.get()?;
        let value = HeaderValue::from_str(identity.as_str())
            .map_err(|e| Error::InvalidIdentity(e.to_string()))?;
        Ok(self.http.request(method, url).header(DEVICE_ID_HEADER, value))
    }

    fn json_request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<RequestBuilder, Error> {
        let mut url = self.url(endpoint)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        debug!("{method} {url}");

        let mut builder = self
            .scoped(method, url)?
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

/// Ensure the base path ends with `/` so relative joins append to it.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// ── Response handling ────────────────────────────────────────────────

async fn send<T: DeserializeOwned>(builder: RequestBuilder, fallback: &str) -> Result<T, Error> {
    let resp = builder
        .send()
        .await
        .map_err(|e| request_failure(fallback, e))?;
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = error_message(&body, fallback);
        debug!(status = status.as_u16(), %message, "request rejected");
        return Err(Error::Request {
            message,
            status: Some(status.as_u16()),
            source: None,
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|e| request_failure(fallback, e))?;
    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "undecodable response body");
        Error::Request {
            message: fallback.to_owned(),
            status: Some(status.as_u16()),
            source: None,
        }
    })
}

/// Extract a human-readable message from an error body.
///
/// A string `detail` is used as-is. A list of validation entries
/// (`[{"msg": ...}, ...]`) is joined with `"; "`. Anything else, including
/// an empty or non-JSON body, yields `fallback`.
pub(crate) fn error_message(body: &str, fallback: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) else {
        return fallback.to_owned();
    };

    match parsed.detail {
        Some(Value::String(detail)) if !detail.is_empty() => detail,
        Some(Value::Array(entries)) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                fallback.to_owned()
            } else {
                messages.join("; ")
            }
        }
        _ => fallback.to_owned(),
    }
}

fn request_failure(fallback: &str, err: reqwest::Error) -> Error {
    warn!(error = %err, "request transport failure");
    Error::Request {
        message: fallback.to_owned(),
        status: err.status().map(|s| s.as_u16()),
        source: Some(err),
    }
}

fn encode_failure(err: &serde_json::Error) -> Error {
    Error::Request {
        message: format!("{REQUEST_FAILED}: {err}"),
        status: None,
        source: None,
    }
}

/// MIME type for the upload part, from the file extension.
fn image_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}
