//! A local fake completion model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ideaflow_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<PresetResponse>>,
    requests: Mutex<Vec<ModelRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should answer each request, in order. Every request consumes one
/// entry. If the script is exhausted, an error will be returned.
///
/// Clones share the script and the request log, so a test can keep one
/// clone around to inspect what was sent after handing the other away.
///
/// # Note
///
/// This type is not optimized for production use, every request is copied
/// into the log. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    shared: Arc<Shared>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a response to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        lock(&self.shared.script).push_back(preset);
    }

    /// Appends a text reply to the script.
    #[inline]
    pub fn add_reply<S: Into<String>>(&mut self, text: S) {
        self.add_response(PresetResponse::reply(text));
    }

    /// Sets the default latency of every response.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, oldest first.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.shared.requests).clone()
    }

    /// Returns the number of requests received so far.
    #[inline]
    pub fn request_count(&self) -> usize {
        lock(&self.shared.requests).len()
    }
}

impl Debug for TestModelProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestModelProvider")
            .field("remaining", &lock(&self.shared.script).len())
            .field("received", &self.request_count())
            .finish()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        lock(&self.shared.requests).push(req.clone());
        let preset = lock(&self.shared.script).pop_front();

        let delay = preset
            .as_ref()
            .and_then(|p| p.delay_ms.map(Duration::from_millis))
            .or(self.delay)
            .unwrap_or(Duration::from_millis(1));
        let result = match preset.map(|p| p.outcome) {
            None => Err(Error {
                message: "no enough responses in the script",
                kind: ErrorKind::InvalidRequest,
            }),
            Some(PresetOutcome::Reply(text)) => {
                Ok(ModelResponse::with_text(text))
            }
            Some(PresetOutcome::Failure(failure)) => Err(Error {
                message: "preset failure",
                kind: failure.kind(),
            }),
        };

        async move {
            sleep(delay).await;
            result
        }
    }
}
