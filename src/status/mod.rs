use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::wire::{ServerState, StatusResponse};

pub const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Reachability check for the LLM server and the image backend.
#[derive(Clone)]
pub struct StatusChecker {
    client: Client,
    llm_url: Option<String>,
    image_url: Option<String>,
}

impl StatusChecker {
    pub fn new(llm_url: Option<String>, image_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(CHECK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, llm_url, image_url }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.llm_base_url().ok(), cfg.image_url.clone())
    }

    async fn check_url(&self, url: Option<&str>) -> ServerState {
        let Some(url) = url else {
            return ServerState::Offline;
        };
        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => ServerState::Online,
            Ok(resp) => {
                log::debug!("status: {} answered {}", url, resp.status());
                ServerState::Offline
            }
            Err(e) => {
                log::debug!("status: {} unreachable: {}", url, e);
                ServerState::Offline
            }
        }
    }

    /// Check both targets concurrently.
    pub async fn check_once(&self) -> StatusResponse {
        let (llm, image) = futures::join!(
            self.check_url(self.llm_url.as_deref()),
            self.check_url(self.image_url.as_deref())
        );
        StatusResponse { llm_server: llm, comfy_server: image, timestamp: Utc::now() }
    }
}

pub fn checking() -> StatusResponse {
    StatusResponse {
        llm_server: ServerState::Checking,
        comfy_server: ServerState::Checking,
        timestamp: Utc::now(),
    }
}

/// Periodic status polling. Polling stops when the monitor is dropped.
pub struct StatusMonitor {
    rx: watch::Receiver<StatusResponse>,
    task: JoinHandle<()>,
}

impl StatusMonitor {
    /// Publish `checking`, check right away, then every `interval`.
    pub fn start(checker: StatusChecker, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(checking());
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let status = checker.check_once().await;
                if tx.send(status).is_err() {
                    break;
                }
            }
        });
        Self { rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusResponse> {
        self.rx.clone()
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_targets_are_offline() {
        let s = StatusChecker::new(None, None).check_once().await;
        assert_eq!(s.llm_server, ServerState::Offline);
        assert_eq!(s.comfy_server, ServerState::Offline);
    }

    #[tokio::test]
    async fn refused_connection_is_offline() {
        let s = StatusChecker::new(Some("http://127.0.0.1:9".into()), None).check_once().await;
        assert_eq!(s.llm_server, ServerState::Offline);
    }

    #[tokio::test]
    async fn monitor_starts_checking_then_publishes() {
        let monitor = StatusMonitor::start(StatusChecker::new(None, None), Duration::from_secs(30));
        let mut rx = monitor.subscribe();
        assert_eq!(rx.borrow().llm_server, ServerState::Checking);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().llm_server, ServerState::Offline);
        assert_eq!(rx.borrow().comfy_server, ServerState::Offline);
    }

    #[tokio::test]
    async fn dropping_monitor_stops_polling() {
        let monitor = StatusMonitor::start(StatusChecker::new(None, None), Duration::from_millis(10));
        let mut rx = monitor.subscribe();
        rx.changed().await.unwrap();
        drop(monitor);
        // the sender goes away with the aborted task
        while rx.changed().await.is_ok() {}
        assert!(rx.has_changed().is_err());
    }
}
