//! Push transport bridge.
//!
//! Reads newline-delimited JSON payloads from an async byte stream (TCP in
//! production) and publishes each onto the update bus. Lines that are not
//! JSON at all are skipped here; shape validation belongs to the normalizer
//! downstream, so a payload of the wrong *schema* still flows through.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::UpdateBus;

/// Spawn a task that feeds `reader` into `bus` on `topic`.
///
/// The task ends on EOF or read error; there is no reconnection policy at
/// this layer. The returned handle can be awaited or aborted on teardown.
pub fn spawn_feed<R>(reader: R, bus: UpdateBus, topic: &str, description: &str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let topic = topic.to_string();
    let description = description.to_string();

    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!(source = %description, "push feed closed");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(payload) => {
                            bus.publish(&topic, &payload);
                        }
                        Err(e) => {
                            warn!(source = %description, error = %e, "skipping unparseable push line");
                        }
                    }
                }
                Err(e) => {
                    warn!(source = %description, error = %e, "push feed read error");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::METRICS_TOPIC;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_feed_publishes_each_line() {
        let bus = UpdateBus::new();
        let mut subscription = bus.subscribe(METRICS_TOPIC);

        let data = "{\"seq\": 1}\n{\"seq\": 2}\n";
        let handle = spawn_feed(Cursor::new(data.to_string()), bus, METRICS_TOPIC, "test");
        handle.await.unwrap();

        assert_eq!(subscription.recv().await.unwrap()["seq"], 1);
        assert_eq!(subscription.recv().await.unwrap()["seq"], 2);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_non_json_lines_are_skipped() {
        let bus = UpdateBus::new();
        let mut subscription = bus.subscribe(METRICS_TOPIC);

        let data = "not json\n{\"seq\": 3}\n\n";
        let handle = spawn_feed(Cursor::new(data.to_string()), bus, METRICS_TOPIC, "test");
        handle.await.unwrap();

        assert_eq!(subscription.recv().await.unwrap()["seq"], 3);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_feed_ends_on_eof() {
        let bus = UpdateBus::new();
        let handle = spawn_feed(Cursor::new(String::new()), bus, METRICS_TOPIC, "test");
        handle.await.unwrap();
    }
}
