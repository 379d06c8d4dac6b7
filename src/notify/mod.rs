// Outbound failure notifications
//
// Best-effort sink with no ordering guarantee: alerts flow through a bounded
// queue into a detached worker that POSTs them to a webhook. The worker
// shares no mutable state with the trading cycle and never blocks it.

use tokio::sync::mpsc;

const QUEUE_CAPACITY: usize = 32;

/// One alert per exhausted-retry sell failure
#[derive(Debug, Clone, PartialEq)]
pub struct FailureAlert {
    pub symbol: String,
    pub message: String,
}

/// Cheap-to-clone handle for emitting alerts
#[derive(Clone)]
pub struct AlertSender {
    tx: Option<mpsc::Sender<FailureAlert>>,
}

impl AlertSender {
    /// Sink that silently discards everything (no webhook configured)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue an alert without waiting; a full or closed queue drops it
    pub fn send(&self, symbol: &str, message: &str) {
        let Some(tx) = &self.tx else {
            return;
        };

        let alert = FailureAlert {
            symbol: symbol.to_string(),
            message: message.to_string(),
        };

        if let Err(e) = tx.try_send(alert) {
            tracing::warn!("alert for {} dropped: {}", symbol, e);
        }
    }
}

/// Build a sender plus its receiving end, without spawning a worker
pub fn channel(capacity: usize) -> (AlertSender, mpsc::Receiver<FailureAlert>) {
    let (tx, rx) = mpsc::channel(capacity);
    (AlertSender { tx: Some(tx) }, rx)
}

/// Spawn the detached webhook worker and return its sender handle
pub fn spawn_worker(webhook_url: String) -> AlertSender {
    let (sender, mut rx) = channel(QUEUE_CAPACITY);

    tokio::spawn(async move {
        let client = reqwest::Client::new();

        while let Some(alert) = rx.recv().await {
            let payload = serde_json::json!({
                "text": format!("{}: {}", alert.symbol, alert.message),
            });

            match client.post(&webhook_url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("alert for {} delivered", alert.symbol);
                }
                Ok(response) => {
                    tracing::warn!(
                        "alert webhook answered {} for {}",
                        response.status(),
                        alert.symbol
                    );
                }
                Err(e) => {
                    tracing::warn!("alert webhook failed for {}: {}", alert.symbol, e);
                }
            }
        }
    });

    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (sender, mut rx) = channel(4);
        sender.send("BTCUSDT", "sell rejected");

        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.symbol, "BTCUSDT");
        assert_eq!(alert.message, "sell rejected");
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_blocking() {
        let (sender, mut rx) = channel(1);
        sender.send("BTCUSDT", "first");
        sender.send("BTCUSDT", "second"); // dropped, queue is full

        assert_eq!(rx.recv().await.unwrap().message, "first");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disabled_sender_is_a_no_op() {
        let sender = AlertSender::disabled();
        sender.send("BTCUSDT", "nobody listens");
    }

    #[tokio::test]
    async fn test_worker_posts_to_webhook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"text": "BTCUSDT: sell rejected"}"#.to_string(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let sender = spawn_worker(format!("{}/hook", server.url()));
        sender.send("BTCUSDT", "sell rejected");

        // Fire-and-forget: poll until the detached worker has delivered
        for _ in 0..100 {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        mock.assert_async().await;
    }
}
