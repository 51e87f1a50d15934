// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {
    crate::package_version::VersionError,
    serde::Deserialize,
    std::fmt::{Display, Formatter},
    thiserror::Error,
};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum AptlyError {
    #[error("URL error: {0:?}")]
    Url(#[from] url::ParseError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("invalid package key: {0}")]
    InvalidKey(String),

    #[error("invalid direct package reference: {0}")]
    InvalidDirectRef(String),

    #[error("control file parse error: {0}")]
    ControlParse(String),

    #[error("malformed package file {0}: {1}")]
    MalformedPackage(String, String),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("aptly API error: {0}")]
    Api(ApiError),

    #[error("HTTP transport error: {0:?}")]
    Transport(reqwest::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0:?}")]
    Json(#[from] serde_json::Error),
}

impl AptlyError {
    /// Whether this error is a server-side not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(api) if api.status == 404)
    }

    /// Whether this error is a local failure (parse or filesystem), as
    /// opposed to anything that involved the server.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Version(_)
                | Self::InvalidKey(_)
                | Self::InvalidDirectRef(_)
                | Self::ControlParse(_)
                | Self::MalformedPackage(_, _)
                | Self::Io(_)
                | Self::IoPath(_, _)
                | Self::Config(_)
        )
    }
}

impl From<reqwest::Error> for AptlyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e)
    }
}

/// A structured error response from the aptly API.
///
/// aptly reports failures as a JSON object `{"error": ..., "meta": ...}`, a
/// list of such objects, or occasionally an opaque string. All forms are
/// retained so callers can inspect individual errors while `Display` renders
/// the human form.
#[derive(Clone, Debug)]
pub struct ApiError {
    /// HTTP status code of the response.
    pub status: u16,

    /// Parsed `(error, meta)` pairs, if the body was structured.
    pub errors: Vec<(String, String)>,

    /// The raw response body as text.
    pub body: String,
}

#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    meta: String,
}

impl ApiError {
    /// Construct an instance from an HTTP status and response body.
    pub fn new(status: u16, body: &[u8]) -> Self {
        let body = String::from_utf8_lossy(body).to_string();

        let errors = match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(serde_json::Value::Object(_)) => serde_json::from_str::<WireError>(&body)
                .map(|e| vec![(e.error, e.meta)])
                .unwrap_or_default(),
            Ok(serde_json::Value::Array(_)) => serde_json::from_str::<Vec<WireError>>(&body)
                .map(|es| es.into_iter().map(|e| (e.error, e.meta)).collect())
                .unwrap_or_default(),
            _ => vec![],
        };

        Self {
            status,
            errors,
            body,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_bad_request(&self) -> bool {
        self.status == 400
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    fn status_line(&self) -> String {
        let phrase = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");

        format!("{} {}", self.status, phrase)
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let render = |(error, meta): &(String, String)| -> String {
            if meta.is_empty() {
                error.clone()
            } else {
                format!("{} ({})", error, meta)
            }
        };

        match self.errors.as_slice() {
            [] if self.body.is_empty() => write!(f, "{}", self.status_line()),
            [] => write!(f, "{}: {}", self.status_line(), self.body),
            [single] => write!(f, "{}", render(single)),
            many => {
                let rendered = many.iter().map(render).collect::<Vec<_>>();
                write!(f, "Multiple errors: {}", rendered.join("; "))
            }
        }
    }
}

impl From<ApiError> for AptlyError {
    fn from(e: ApiError) -> Self {
        Self::Api(e)
    }
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, AptlyError>;
