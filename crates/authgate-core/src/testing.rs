//! Test doubles shared by the unit tests.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::api::{ApiRequest, HttpReply, Transport, TransportError};

type Outcome = Result<HttpReply, TransportError>;

enum Step {
    Ready(Outcome),
    Gated(oneshot::Receiver<Outcome>),
}

/// Transport that plays back a script of replies and records every request.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    seen: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(&self, status: u16, body: &str) -> &Self {
        self.script
            .lock()
            .push_back(Step::Ready(Ok(HttpReply::new(status, body))));
        self
    }

    pub fn no_response(&self) -> &Self {
        self.script.lock().push_back(Step::Ready(Err(TransportError::NoResponse(
            "connection refused".to_string(),
        ))));
        self
    }

    /// Queue a reply that is held back until the returned sender fires
    pub fn gate(&self) -> oneshot::Sender<Outcome> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().push_back(Step::Gated(rx));
        tx
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.seen.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Outcome> {
        self.seen.lock().push(request.clone());
        let step = self.script.lock().pop_front();
        async move {
            match step {
                Some(Step::Ready(outcome)) => outcome,
                Some(Step::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(TransportError::Other("gate dropped".to_string()))),
                None => Err(TransportError::Other("script exhausted".to_string())),
            }
        }
        .boxed()
    }

    fn base_url(&self) -> &str {
        "http://backend.test"
    }
}
