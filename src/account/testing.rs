//! Scripted transport for tests

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

use super::error::TransportError;
use super::transport::{HttpRequest, HttpResponse, Transport};

/// What the transport does with the next request
pub enum Script {
    Respond(Result<HttpResponse, TransportError>),
    /// Respond once the gate is notified
    Gated(Arc<Notify>, HttpResponse),
    /// Never respond
    Hang,
}

impl Script {
    pub fn ok(status: u16, body: &str) -> Self {
        Script::Respond(Ok(HttpResponse::new(status, body)))
    }

    pub fn gated(gate: Arc<Notify>, status: u16, body: &str) -> Self {
        Script::Gated(gate, HttpResponse::new(status, body))
    }
}

/// Records requests and replays scripted responses in order
pub struct ScriptedTransport {
    enabled: bool,
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            enabled: true,
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn disabled() -> Arc<Self> {
        Arc::new(Self {
            enabled: false,
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn execute(
        &self,
        request: HttpRequest,
    ) -> BoxFuture<'static, Result<HttpResponse, TransportError>> {
        self.requests.lock().push(request);

        match self.scripts.lock().pop_front() {
            Some(Script::Respond(result)) => future::ready(result).boxed(),
            Some(Script::Gated(gate, response)) => async move {
                gate.notified().await;
                Ok::<_, TransportError>(response)
            }
            .boxed(),
            Some(Script::Hang) => future::pending::<Result<HttpResponse, TransportError>>().boxed(),
            None => {
                let err = TransportError::Request("no scripted response".to_string());
                future::ready(Err(err)).boxed()
            }
        }
    }
}
