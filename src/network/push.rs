//! Push path: master → relay
//!
//! Each lifecycle transition becomes one HTTP request against the relay's
//! `/roll` endpoint. Requests are queued to a single worker task, so they
//! leave in the order they were issued. Failures are logged and counted,
//! never returned: the master's own state is authoritative either way.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::roll::RollEvent;
use crate::stats::BroadcastCounters;

use super::config::NetworkConfig;
use super::endpoint::Endpoints;

/// One request for the relay
#[derive(Debug, Clone, PartialEq)]
pub enum PushCommand {
    /// `POST {base}/roll` with the event as JSON
    Post(RollEvent),
    /// `DELETE {base}/roll`
    Delete,
}

impl PushCommand {
    fn method(&self) -> &'static str {
        match self {
            PushCommand::Post(_) => "POST",
            PushCommand::Delete => "DELETE",
        }
    }
}

/// Fire-and-forget request queue
pub struct RollPusher {
    tx: mpsc::UnboundedSender<(Endpoints, PushCommand)>,
}

impl RollPusher {
    /// Spawn the push worker
    ///
    /// Must be called from within a Tokio runtime. The worker drains its
    /// queue and exits once the pusher is dropped.
    pub fn spawn(config: &NetworkConfig, counters: Arc<BroadcastCounters>) -> Self {
        let client = match reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(client, rx, counters));

        Self { tx }
    }

    /// Queue a request for `endpoints`
    pub fn push(&self, endpoints: Endpoints, command: PushCommand) {
        if self.tx.send((endpoints, command)).is_err() {
            tracing::warn!("Push worker has stopped, dropping request");
        }
    }
}

async fn run_worker(
    client: reqwest::Client,
    mut rx: mpsc::UnboundedReceiver<(Endpoints, PushCommand)>,
    counters: Arc<BroadcastCounters>,
) {
    while let Some((endpoints, command)) = rx.recv().await {
        let method = command.method();

        match send(&client, &endpoints, command).await {
            Ok(()) => {
                counters.push_sent();
                tracing::debug!(method, url = %endpoints.roll_url(), "Roll pushed");
            }
            Err(Error::Status(status)) => {
                counters.push_failed();
                tracing::error!(method, url = %endpoints.roll_url(), status, "Roll push rejected");
            }
            Err(e) => {
                counters.push_failed();
                tracing::error!(method, url = %endpoints.roll_url(), error = %e, "Roll push failed");
            }
        }
    }

    tracing::debug!("Push worker stopped");
}

async fn send(client: &reqwest::Client, endpoints: &Endpoints, command: PushCommand) -> Result<()> {
    let url = endpoints.roll_url().clone();

    let response = match command {
        PushCommand::Post(event) => {
            let body = Bytes::from(serde_json::to_vec(&event)?);
            client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?
        }
        PushCommand::Delete => client.delete(url).send().await?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status.as_u16()));
    }
    Ok(())
}
