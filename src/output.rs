//! Presentation sinks: console log lines, dashboard push, fan-out.

use std::sync::Arc;
use std::time::Duration;

use common::{format_error_chain, Notification, Reporter};
use serde_json::json;
use tracing::{debug, info, warn};

const DASHBOARD_TIMEOUT: Duration = Duration::from_secs(20);

/// Logs every stage transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::Waiting { next_game, prize } => info!(
                "⏳ Waiting: next show {} prize {}",
                next_game
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "unknown".into()),
                prize.as_deref().unwrap_or("unknown")
            ),
            Notification::Starting => info!("📡 Broadcast starting"),
            Notification::Ended { reason } => match reason {
                Some(r) => info!("🏁 Broadcast ended: {}", r),
                None => info!("🏁 Broadcast ended"),
            },
            other => debug!("{} {}", other.stage(), other.payload()),
        }
    }
}

/// POSTs `{"info": payload}` to `{base}/hero/{stage}` on a detached task.
#[derive(Debug, Clone)]
pub struct DashboardReporter {
    client: reqwest::Client,
    base_url: String,
}

impl DashboardReporter {
    pub fn new(base_url: &str) -> Result<Self, common::Error> {
        let client = reqwest::Client::builder()
            .timeout(DASHBOARD_TIMEOUT)
            .build()
            .map_err(|e| common::Error::Http(format_error_chain(&e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }
}

impl Reporter for DashboardReporter {
    fn notify(&self, notification: Notification) {
        let url = format!("{}{}", self.base_url, notification.endpoint());
        let body = json!({ "info": notification.payload() });
        let client = self.client.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    warn!("Dashboard push to {} returned {}", url, resp.status());
                }
                Ok(_) => {}
                Err(e) => warn!("Dashboard push to {} failed: {}", url, format_error_chain(&e)),
            }
        });
    }
}

/// Delivers each notification to every inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    sinks: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn with(mut self, sink: impl Reporter + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Reporter for FanoutReporter {
    fn notify(&self, notification: Notification) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.notify(notification.clone());
            }
            last.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Recording {
        stages: Mutex<Vec<&'static str>>,
    }

    impl Reporter for Recording {
        fn notify(&self, notification: Notification) {
            self.stages.lock().unwrap().push(notification.stage());
        }
    }

    /// Read one HTTP request (head and Content-Length body).
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    #[tokio::test]
    async fn test_dashboard_posts_stage_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = mpsc::channel::<String>(1);
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
            let _ = tx.send(request).await;
        });

        let reporter = DashboardReporter::new(&format!("http://{}/", addr)).unwrap();
        reporter.notify(Notification::Ended { reason: None });

        let request = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(request.starts_with("POST /hero/ended "), "{request}");
        assert!(request.ends_with(r#"{"info":{}}"#), "{request}");
    }

    #[tokio::test]
    async fn test_unreachable_dashboard_never_blocks() {
        let reporter = DashboardReporter::new("http://127.0.0.1:9").unwrap();
        let started = Instant::now();
        for _ in 0..10 {
            reporter.notify(Notification::Starting);
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let fanout = FanoutReporter::default()
            .with(a.clone())
            .with(ConsoleReporter)
            .with(b.clone());
        assert_eq!(fanout.len(), 3);

        fanout.notify(Notification::Starting);
        fanout.notify(Notification::Ended { reason: None });

        assert_eq!(*a.stages.lock().unwrap(), vec!["starting", "ended"]);
        assert_eq!(*b.stages.lock().unwrap(), vec!["starting", "ended"]);
    }
}
