//! Blocking queue of discovered logins
//!
//! One producer (the coordinator paging partitions) and any number of
//! consumers (enrichment workers). Consumers wait without polling; they see
//! the end of the queue only once the producer has finished and every queued
//! login has been taken.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Creates a connected producer/consumer pair
pub fn entity_queue() -> (EntityProducer, EntityConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));

    (
        EntityProducer {
            tx,
            pending: Arc::clone(&pending),
        },
        EntityConsumer {
            rx: Arc::new(Mutex::new(rx)),
            pending,
        },
    )
}

/// Sending half of the queue
#[derive(Debug)]
pub struct EntityProducer {
    tx: UnboundedSender<String>,
    pending: Arc<AtomicUsize>,
}

impl EntityProducer {
    /// Queues a login, waking one waiting consumer
    ///
    /// Returns false if every consumer is gone.
    pub fn push(&self, login: String) -> bool {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(login).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Signals that no more logins will be queued, waking every waiting consumer
    pub fn finish(self) {
        drop(self);
    }

    /// Logins queued but not yet taken
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Receiving half of the queue; clones share the same queue
#[derive(Debug, Clone)]
pub struct EntityConsumer {
    rx: Arc<Mutex<UnboundedReceiver<String>>>,
    pending: Arc<AtomicUsize>,
}

impl EntityConsumer {
    /// Waits for the next login
    ///
    /// # Returns
    ///
    /// * `Some(login)` - The next queued login
    /// * `None` - The producer finished and the queue is drained, or `cancel` fired
    pub async fn next(&self, cancel: &CancellationToken) -> Option<String> {
        if cancel.is_cancelled() {
            return None;
        }

        let mut rx = self.rx.lock().await;
        let login = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            login = rx.recv() => login,
        };

        if login.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        login
    }

    /// Logins queued but not yet taken
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_then_end_after_finish() {
        let (producer, consumer) = entity_queue();
        let cancel = CancellationToken::new();

        assert!(producer.push("a".to_string()));
        assert!(producer.push("b".to_string()));
        assert_eq!(producer.pending(), 2);
        producer.finish();

        assert_eq!(consumer.next(&cancel).await.as_deref(), Some("a"));
        assert_eq!(consumer.next(&cancel).await.as_deref(), Some("b"));
        assert_eq!(consumer.next(&cancel).await, None);
        assert_eq!(consumer.pending(), 0);
    }

    #[tokio::test]
    async fn test_waiting_consumer_woken_by_push() {
        let (producer, consumer) = entity_queue();
        let cancel = CancellationToken::new();

        let waiter = {
            let consumer = consumer.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { consumer.next(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.push("late".to_string());

        let login = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_finish_wakes_every_consumer() {
        let (producer, consumer) = entity_queue();
        let cancel = CancellationToken::new();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let consumer = consumer.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move { consumer.next(&cancel).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.finish();

        for waiter in waiters {
            let login = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(login, None);
        }
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiting_consumer() {
        let (producer, consumer) = entity_queue();
        let cancel = CancellationToken::new();

        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move { consumer.next(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let login = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login, None);
        drop(producer);
    }

    #[tokio::test]
    async fn test_push_fails_without_consumers() {
        let (producer, consumer) = entity_queue();
        drop(consumer);

        assert!(!producer.push("a".to_string()));
        assert_eq!(producer.pending(), 0);
    }
}
