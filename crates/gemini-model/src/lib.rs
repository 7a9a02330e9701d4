//! A model provider for the Gemini `generateContent` API.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use ideaflow_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};
use reqwest::{Client, Url, header};

pub use config::{GeminiConfig, GeminiConfigBuilder};
use proto::{ApiErrorResponse, GenerateContentResponse};

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Transport
        };
        Self::new(format!("{err}"), kind)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Creates a new `GeminiProvider` that sends requests through a
    /// preconfigured HTTP client.
    #[inline]
    pub fn with_client(config: GeminiConfig, client: Client) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req);
        let endpoint = self.config.endpoint();
        let resp_fut = Url::parse_with_params(
            &endpoint,
            [("key", self.config.api_key.as_str())],
        )
        .map(|url| {
            self.client
                .post(url)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/json")
                .json(&body)
                .send()
        })
        .map_err(|err| {
            Error::new(
                format!("invalid endpoint {endpoint}: {err}"),
                ErrorKind::InvalidRequest,
            )
        });

        async move {
            let resp = resp_fut?.await.map_err(Error::from_transport)?;

            let status = resp.status();
            let body = resp.text().await.map_err(Error::from_transport)?;
            trace!("got response ({status}): {body}");

            if !status.is_success() {
                let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                    .map(|err| err.error.message)
                    .unwrap_or_else(|_| {
                        status.canonical_reason().unwrap_or("").to_owned()
                    });
                warn!("completion endpoint returned {status}");
                return Err(Error::new(
                    format!("{status} {detail}").trim_end().to_owned(),
                    ErrorKind::Status,
                ));
            }

            let parsed =
                serde_json::from_str::<GenerateContentResponse>(&body)
                    .map_err(|err| {
                        Error::new(format!("{err}"), ErrorKind::MalformedResponse)
                    })?;
            proto::extract_response(parsed).ok_or_else(|| {
                Error::new(
                    "response has no candidate text",
                    ErrorKind::MalformedResponse,
                )
            })
        }
    }
}
