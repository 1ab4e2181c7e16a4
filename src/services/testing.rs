//! In-memory doubles for the network seams, used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::fetcher::{PageResponse, PageTransport};
use crate::services::notifier::{MessageSender, SendOptions};

#[derive(Default)]
struct Route {
    body: Option<String>,
    script: VecDeque<std::result::Result<u16, &'static str>>,
    unreachable: Option<&'static str>,
    calls: usize,
}

/// Transport answering from per-URL scripts.
///
/// Each call pops the next scripted outcome for the URL; once the script is
/// empty the URL answers 200. Bodies default to `"body of {url}"`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, body: impl Into<String>) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .body = Some(body.into());
        self
    }

    pub fn script(
        &self,
        url: &str,
        outcomes: impl IntoIterator<Item = std::result::Result<u16, &'static str>>,
    ) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .script
            .extend(outcomes);
        self
    }

    /// Make every request to `url` fail with a non-transient error.
    pub fn unreachable(&self, url: &str, message: &'static str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .unreachable = Some(message);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(url)
            .map_or(0, |route| route.calls)
    }
}

#[async_trait]
impl PageTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<PageResponse> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.entry(url.to_string()).or_default();
        route.calls += 1;

        if let Some(message) = route.unreachable {
            return Err(AppError::config(format!("{url}: {message}")));
        }

        let status = match route.script.pop_front() {
            Some(Ok(status)) => status,
            Some(Err(message)) => {
                return Err(AppError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    message,
                )));
            }
            None => 200,
        };
        let body = route
            .body
            .clone()
            .unwrap_or_else(|| format!("body of {url}"));
        Ok(PageResponse { status, body })
    }
}

/// Sender that records every message and optionally refuses them.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String, SendOptions)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text, _)| text.clone())
            .collect()
    }

    pub fn sent(&self) -> Vec<(String, String, SendOptions)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, chat_id: &str, text: &str, options: SendOptions) -> Result<()> {
        if self.fail {
            return Err(AppError::notify("chat not found"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string(), options));
        Ok(())
    }
}
