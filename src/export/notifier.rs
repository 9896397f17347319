//! Requester notifications, delivered off the export path.
//!
//! Builds only enqueue a [`Message`]. A worker task posts it to the
//! messaging backend and asks for immediate delivery, retrying with
//! exponential backoff. Failures end up in the [`DeliveryReport`] and the
//! log; they never reach the build that queued the message.
use crate::error::{CrateError, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub recipient: UserId,
    pub body: String,
    pub sender: UserId,
}

/// Handle on a stored message. The backend only returns `id`; the recipient
/// is filled in locally so delivery errors name the right user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MessageReceipt {
    pub id: u64,
    #[serde(default)]
    pub recipient: UserId,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Stores the message for the recipient.
    async fn post_message(&self, message: &Message) -> Result<MessageReceipt>;
    /// Asks the backend to send a stored message right away.
    async fn send_now(&self, receipt: MessageReceipt) -> Result<()>;
}

/// Posts messages to `{base}/messages` and requests delivery through
/// `{base}/messages/{id}/deliver`.
pub struct HttpMessenger {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMessenger {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::export::search::USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| delivery_error(0, e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

fn delivery_error(recipient: UserId, reason: impl ToString) -> CrateError {
    CrateError::NotificationDelivery {
        recipient,
        reason: reason.to_string(),
    }
}

#[async_trait]
impl Messenger for HttpMessenger {
    async fn post_message(&self, message: &Message) -> Result<MessageReceipt> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .json(message)
            .send()
            .await
            .map_err(|e| delivery_error(message.recipient, e))?
            .error_for_status()
            .map_err(|e| delivery_error(message.recipient, e))?;
        let receipt = response
            .json::<MessageReceipt>()
            .await
            .map_err(|e| delivery_error(message.recipient, e))?;
        Ok(MessageReceipt {
            recipient: message.recipient,
            ..receipt
        })
    }

    async fn send_now(&self, receipt: MessageReceipt) -> Result<()> {
        self.client
            .post(format!("{}/messages/{}/deliver", self.base_url, receipt.id))
            .send()
            .await
            .map_err(|e| delivery_error(receipt.recipient, e))?
            .error_for_status()
            .map_err(|e| delivery_error(receipt.recipient, e))?;
        Ok(())
    }
}

/// Logs messages instead of sending them; used when no messaging backend is configured.
#[derive(Debug, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn post_message(&self, message: &Message) -> Result<MessageReceipt> {
        info!("Message for user {}: {}", message.recipient, message.body);
        Ok(MessageReceipt {
            id: 0,
            recipient: message.recipient,
        })
    }

    async fn send_now(&self, _receipt: MessageReceipt) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before `attempt` (1-based): nothing before the first, then 1x, 2x, 4x ... the base.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.base_delay * (1u32 << (attempt - 2).min(5))
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub message: Message,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<FailedDelivery>,
}

pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<Message>,
    worker: JoinHandle<DeliveryReport>,
}

impl NotificationQueue {
    /// Spawns the delivery worker. Must be called inside a tokio runtime.
    pub fn start(messenger: Arc<dyn Messenger>, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(delivery_worker(receiver, messenger, policy));
        Self { sender, worker }
    }

    pub fn enqueue(&self, message: Message) -> Result<()> {
        debug!("Queueing notification for user {}", message.recipient);
        self.sender
            .send(message)
            .map_err(|_| CrateError::NotificationQueueClosed)
    }

    /// Closes the queue, waits for queued messages to be handled and returns the outcome.
    pub async fn shutdown(self) -> DeliveryReport {
        drop(self.sender);
        match self.worker.await {
            Ok(report) => report,
            Err(e) => {
                error!("Notification worker stopped abnormally: {}", e);
                DeliveryReport::default()
            }
        }
    }
}

async fn delivery_worker(
    mut receiver: mpsc::UnboundedReceiver<Message>,
    messenger: Arc<dyn Messenger>,
    policy: RetryPolicy,
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    while let Some(message) = receiver.recv().await {
        match deliver_with_retry(messenger.as_ref(), &message, policy).await {
            Ok(attempts) => {
                info!(
                    "Notified user {} after {} attempt(s)",
                    message.recipient, attempts
                );
                report.delivered += 1;
            }
            Err((attempts, e)) => {
                error!(
                    "Giving up on notification for user {} after {} attempt(s): {}",
                    message.recipient, attempts, e
                );
                report.failed.push(FailedDelivery {
                    message,
                    attempts,
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}

/// Stores the message unless an earlier attempt already did, then asks for delivery.
async fn deliver_once(
    messenger: &dyn Messenger,
    message: &Message,
    stored: &mut Option<MessageReceipt>,
) -> Result<()> {
    let receipt = match *stored {
        Some(receipt) => receipt,
        None => {
            let receipt = messenger.post_message(message).await?;
            *stored = Some(receipt);
            receipt
        }
    };
    messenger.send_now(receipt).await
}

async fn deliver_with_retry(
    messenger: &dyn Messenger,
    message: &Message,
    policy: RetryPolicy,
) -> std::result::Result<u32, (u32, CrateError)> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut stored = None;
    loop {
        tokio::time::sleep(policy.delay_before(attempt)).await;
        match deliver_once(messenger, message, &mut stored).await {
            Ok(()) => return Ok(attempt),
            Err(e) if attempt >= max_attempts => return Err((attempt, e)),
            Err(e) => {
                warn!(
                    "Notification attempt {} for user {} failed: {}",
                    attempt, message.recipient, e
                );
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails the first `failures` posts and the first `send_failures`
    /// delivery requests, then accepts everything.
    struct FlakyMessenger {
        failures: Mutex<u32>,
        send_failures: Mutex<u32>,
        posted: Mutex<Vec<Message>>,
        sent: Mutex<Vec<u64>>,
    }

    impl FlakyMessenger {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                send_failures: Mutex::new(0),
                posted: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing_sends(send_failures: u32) -> Self {
            Self {
                send_failures: Mutex::new(send_failures),
                ..Self::new(0)
            }
        }
    }

    #[async_trait]
    impl Messenger for FlakyMessenger {
        async fn post_message(&self, message: &Message) -> Result<MessageReceipt> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(delivery_error(message.recipient, "backend unavailable"));
            }
            let mut posted = self.posted.lock().unwrap();
            posted.push(message.clone());
            Ok(MessageReceipt {
                id: posted.len() as u64,
                recipient: message.recipient,
            })
        }

        async fn send_now(&self, receipt: MessageReceipt) -> Result<()> {
            let mut send_failures = self.send_failures.lock().unwrap();
            if *send_failures > 0 {
                *send_failures -= 1;
                return Err(delivery_error(receipt.recipient, "relay refused"));
            }
            self.sent.lock().unwrap().push(receipt.id);
            Ok(())
        }
    }

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    fn message(recipient: UserId) -> Message {
        Message {
            recipient,
            body: "ready".to_string(),
            sender: 1,
        }
    }

    #[test]
    fn backoff_doubles_after_first_retry() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn delivers_and_requests_immediate_send() {
        let messenger = Arc::new(FlakyMessenger::new(0));
        let queue = NotificationQueue::start(messenger.clone(), instant_policy(3));
        queue.enqueue(message(7)).unwrap();
        queue.enqueue(message(8)).unwrap();
        let report = queue.shutdown().await;

        assert_eq!(report.delivered, 2);
        assert!(report.failed.is_empty());
        assert_eq!(messenger.posted.lock().unwrap().len(), 2);
        assert_eq!(*messenger.sent.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let messenger = Arc::new(FlakyMessenger::new(2));
        let queue = NotificationQueue::start(messenger.clone(), instant_policy(3));
        queue.enqueue(message(7)).unwrap();
        let report = queue.shutdown().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(messenger.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reports_failure_after_max_attempts() {
        let messenger = Arc::new(FlakyMessenger::new(10));
        let queue = NotificationQueue::start(messenger.clone(), instant_policy(3));
        queue.enqueue(message(7)).unwrap();
        let report = queue.shutdown().await;

        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].attempts, 3);
        assert_eq!(report.failed[0].message.recipient, 7);
        assert!(report.failed[0].reason.contains("backend unavailable"));
        // Three attempts consumed, seven failures left.
        assert_eq!(*messenger.failures.lock().unwrap(), 7);
    }

    #[tokio::test]
    async fn failed_delivery_request_is_retried_without_reposting() {
        let messenger = Arc::new(FlakyMessenger::failing_sends(1));
        let queue = NotificationQueue::start(messenger.clone(), instant_policy(3));
        queue.enqueue(message(7)).unwrap();
        let report = queue.shutdown().await;

        assert_eq!(report.delivered, 1);
        assert_eq!(messenger.posted.lock().unwrap().len(), 1);
        assert_eq!(*messenger.sent.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn delivery_failures_name_the_recipient() {
        let messenger = Arc::new(FlakyMessenger::failing_sends(5));
        let queue = NotificationQueue::start(messenger.clone(), instant_policy(2));
        queue.enqueue(message(7)).unwrap();
        let report = queue.shutdown().await;

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("user 7"));
        assert_eq!(messenger.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn log_messenger_always_succeeds() {
        let queue = NotificationQueue::start(Arc::new(LogMessenger), RetryPolicy::default());
        queue.enqueue(message(3)).unwrap();
        assert_eq!(queue.shutdown().await.delivered, 1);
    }
}
