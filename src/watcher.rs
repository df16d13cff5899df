//! The poll loop: fetch, validate, format, deliver, sleep.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::api::StatusSource;
use crate::error::{Error, Result};
use crate::status;
use crate::telegram::Notifier;

/// Loop-local state threaded through each cycle.
struct CycleState {
    /// Lower time bound for the next fetch, epoch seconds.
    from_date: i64,
    /// Most recently delivered message, for deduplication.
    last_message: Option<String>,
}

pub struct Watcher<S, N> {
    source: S,
    notifier: N,
    poll_interval: Duration,
}

impl<S: StatusSource, N: Notifier> Watcher<S, N> {
    pub fn new(source: S, notifier: N, poll_interval: Duration) -> Self {
        Self {
            source,
            notifier,
            poll_interval,
        }
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// Every error short of process death is absorbed here: it is logged,
    /// the cycle is abandoned, and the next one starts after the usual
    /// sleep.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut state = CycleState {
            from_date: Utc::now().timestamp(),
            last_message: None,
        };

        loop {
            if let Err(err) = self.run_cycle(&mut state).await {
                tracing::error!(error = %err, "Polling cycle failed");
                if err.warrants_notification() {
                    self.notify_failure(&mut state, &err).await;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping watcher");
                    return;
                }
            }
        }
    }

    /// One fetch/validate/format/deliver pass.
    ///
    /// The cursor advances only when the whole pass succeeds, so a failed
    /// cycle re-requests the same window next time.
    async fn run_cycle(&self, state: &mut CycleState) -> Result<()> {
        let response = self.source.fetch(state.from_date).await?;
        let homeworks = status::check_response(&response)?;

        match homeworks.first() {
            Some(homework) => {
                let message = status::parse_status(homework)?;
                self.deliver(state, message).await?;
            }
            None => {
                tracing::debug!(from_date = state.from_date, "No status updates");
            }
        }

        if let Some(date) = status::current_date(&response) {
            state.from_date = date;
        }
        Ok(())
    }

    /// Send `message` unless it repeats the last delivered one.
    async fn deliver(&self, state: &mut CycleState, message: String) -> Result<()> {
        if state.last_message.as_deref() == Some(message.as_str()) {
            tracing::debug!("Status unchanged, skipping notification");
            return Ok(());
        }
        self.notifier.send_message(&message).await?;
        tracing::info!(message = %message, "Notification delivered");
        state.last_message = Some(message);
        Ok(())
    }

    /// Best-effort report of a broken cycle to the chat.
    async fn notify_failure(&self, state: &mut CycleState, err: &Error) {
        let message = format!("Сбой в работе программы: {err}");
        if let Err(send_err) = self.deliver(state, message).await {
            tracing::warn!(error = %send_err, "Failed to deliver failure notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    struct FakeSource {
        responses: Mutex<VecDeque<Result<Value>>>,
    }

    impl FakeSource {
        fn new(responses: Vec<Result<Value>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn fetch(&self, _from_date: i64) -> Result<Value> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"homeworks": []})))
        }
    }

    struct FakeNotifier {
        sent: Mutex<Vec<String>>,
        failures: Mutex<VecDeque<Error>>,
    }

    impl FakeNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failures: Mutex::new(VecDeque::new()),
            }
        }

        fn failing_once() -> Self {
            let notifier = Self::new();
            notifier.failures.lock().unwrap().push_back(Error::Send {
                chat_id: "456".to_string(),
                reason: "chat not found".to_string(),
            });
            notifier
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send_message(&self, text: &str) -> Result<()> {
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn state(from_date: i64) -> CycleState {
        CycleState {
            from_date,
            last_message: None,
        }
    }

    fn approved_response(current_date: i64) -> Value {
        json!({
            "homeworks": [{"homework_name": "hw1", "status": "approved"}],
            "current_date": current_date,
        })
    }

    const APPROVED_MESSAGE: &str = "Изменился статус проверки работы \"hw1\". \
         Работа проверена: ревьюеру всё понравилось. Ура!";

    #[tokio::test]
    async fn successful_cycle_notifies_and_advances_cursor() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(approved_response(1000))]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(0);

        watcher.run_cycle(&mut state).await.unwrap();

        assert_eq!(watcher.notifier.sent(), vec![APPROVED_MESSAGE.to_string()]);
        assert_eq!(state.from_date, 1000);
        assert_eq!(state.last_message.as_deref(), Some(APPROVED_MESSAGE));
    }

    #[tokio::test]
    async fn fetch_error_leaves_cursor_unchanged() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Err(Error::FetchStatus {
                endpoint: "https://example.com",
                from_date: 17,
                status: reqwest::StatusCode::BAD_GATEWAY,
            })]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(17);

        let err = watcher.run_cycle(&mut state).await.unwrap_err();

        assert!(matches!(err, Error::FetchStatus { .. }));
        assert!(!err.warrants_notification());
        assert!(watcher.notifier.sent().is_empty());
        assert_eq!(state.from_date, 17);
    }

    #[tokio::test]
    async fn empty_homework_list_completes_quietly() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(json!({"homeworks": []}))]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(17);

        watcher.run_cycle(&mut state).await.unwrap();

        assert!(watcher.notifier.sent().is_empty());
        assert_eq!(state.from_date, 17);
    }

    #[tokio::test]
    async fn repeated_status_is_delivered_once() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(approved_response(1000)), Ok(approved_response(2000))]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(0);

        watcher.run_cycle(&mut state).await.unwrap();
        watcher.run_cycle(&mut state).await.unwrap();

        assert_eq!(watcher.notifier.sent().len(), 1);
        assert_eq!(state.from_date, 2000);
    }

    #[tokio::test]
    async fn malformed_response_abandons_cycle() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(json!({"homeworks": "hw1"}))]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(17);

        let err = watcher.run_cycle(&mut state).await.unwrap_err();

        assert!(err.warrants_notification());
        assert!(watcher.notifier.sent().is_empty());
        assert_eq!(state.from_date, 17);
    }

    #[tokio::test]
    async fn send_failure_blocks_cursor_and_dedup_state() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(approved_response(1000)), Ok(approved_response(1000))]),
            FakeNotifier::failing_once(),
            Duration::from_secs(600),
        );
        let mut state = state(0);

        let err = watcher.run_cycle(&mut state).await.unwrap_err();
        assert!(matches!(err, Error::Send { .. }));
        assert_eq!(state.from_date, 0);
        assert_eq!(state.last_message, None);

        // The unchanged cursor re-surfaces the update next cycle.
        watcher.run_cycle(&mut state).await.unwrap();
        assert_eq!(watcher.notifier.sent(), vec![APPROVED_MESSAGE.to_string()]);
        assert_eq!(state.from_date, 1000);
    }

    #[tokio::test]
    async fn failure_notification_is_deduplicated() {
        let watcher = Watcher::new(
            FakeSource::new(vec![]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let mut state = state(0);
        let err = Error::MissingKey("homeworks");

        watcher.notify_failure(&mut state, &err).await;
        watcher.notify_failure(&mut state, &err).await;

        let sent = watcher.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Сбой в работе программы:"));
    }

    #[tokio::test]
    async fn run_stops_on_cancelled_token() {
        let watcher = Watcher::new(
            FakeSource::new(vec![Ok(approved_response(1000))]),
            FakeNotifier::new(),
            Duration::from_secs(600),
        );
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        watcher.run(shutdown).await;

        assert_eq!(watcher.notifier.sent().len(), 1);
    }
}
