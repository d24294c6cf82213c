//! Blocking bounded queue between the producer and the consumer
//!
//! The queue is a [`Ring`] behind a single lock plus two wake-up signals:
//! "room available" gates `push` and is raised by every successful pop,
//! "data available" gates `pop` and is raised by every successful push.
//! The lock is only held for the O(1) ring operation, never across an await.

use crate::pipeline::Shutdown;
use parking_lot::Mutex;
use queuepilot::{QueueCounts, Ring};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Fixed-capacity FIFO with blocking push and pop
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    room_available: Notify,
    data_available: Notify,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            ring: Mutex::new(Ring::new(capacity)),
            room_available: Notify::new(),
            data_available: Notify::new(),
        }
    }

    /// Insert `item`, waiting while the queue is full
    pub async fn push(&self, item: T, shutdown: &CancellationToken) -> Result<(), Shutdown> {
        let mut item = item;
        loop {
            let room = self.room_available.notified();
            tokio::pin!(room);
            // Register before checking so a pop between the check and the
            // await still wakes us
            room.as_mut().enable();

            let pushed = self.ring.lock().try_push(item);
            match pushed {
                Ok(()) => {
                    self.data_available.notify_one();
                    return Ok(());
                }
                Err(rejected) => item = rejected,
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(Shutdown),
                _ = &mut room => {}
            }
        }
    }

    /// Remove the oldest item, waiting while the queue is empty
    pub async fn pop(&self, shutdown: &CancellationToken) -> Result<T, Shutdown> {
        loop {
            let data = self.data_available.notified();
            tokio::pin!(data);
            data.as_mut().enable();

            let popped = self.ring.lock().try_pop();
            if let Some(item) = popped {
                self.room_available.notify_one();
                return Ok(item);
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(Shutdown),
                _ = &mut data => {}
            }
        }
    }

    /// Produced/consumed totals and occupancy, read under the queue lock
    pub fn counts(&self) -> QueueCounts {
        self.ring.lock().counts()
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_push_pop_fifo() {
        let queue = BoundedQueue::new(3);
        let shutdown = CancellationToken::new();

        for i in 0..3u64 {
            queue.push(i, &shutdown).await.unwrap();
        }
        for i in 0..3u64 {
            assert_eq!(queue.pop(&shutdown).await.unwrap(), i);
        }

        let counts = queue.counts();
        assert_eq!(counts.produced_total, 3);
        assert_eq!(counts.consumed_total, 3);
        assert_eq!(counts.occupancy, 0);
    }

    #[tokio::test]
    async fn test_push_blocks_when_full() {
        let queue = Arc::new(BoundedQueue::new(2));
        let shutdown = CancellationToken::new();

        queue.push(1u64, &shutdown).await.unwrap();
        queue.push(2u64, &shutdown).await.unwrap();

        let blocked = timeout(Duration::from_millis(50), queue.push(3, &shutdown)).await;
        assert!(blocked.is_err(), "push on a full queue must wait");

        let pusher = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.push(3, &shutdown).await })
        };

        assert_eq!(queue.pop(&shutdown).await.unwrap(), 1);
        pusher.await.unwrap().unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(&shutdown).await.unwrap(), 2);
        assert_eq!(queue.pop(&shutdown).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pop_blocks_when_empty() {
        let queue = Arc::new(BoundedQueue::<u64>::new(4));
        let shutdown = CancellationToken::new();

        let popper = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.pop(&shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!popper.is_finished());

        queue.push(42, &shutdown).await.unwrap();
        assert_eq!(popper.await.unwrap().unwrap(), 42);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiters() {
        let queue = Arc::new(BoundedQueue::<u64>::new(1));
        let shutdown = CancellationToken::new();
        queue.push(0, &shutdown).await.unwrap();

        let pusher = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { queue.push(1, &shutdown).await })
        };

        let empty = Arc::new(BoundedQueue::<u64>::new(1));
        let popper = {
            let empty = Arc::clone(&empty);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { empty.pop(&shutdown).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        assert!(pusher.await.unwrap().is_err());
        assert!(popper.await.unwrap().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfer_preserves_order_and_counts() {
        let queue = Arc::new(BoundedQueue::new(8));
        let shutdown = CancellationToken::new();
        const ITEMS: u64 = 5_000;

        let producer = {
            let queue = Arc::clone(&queue);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                for i in 0..ITEMS {
                    queue.push(i, &shutdown).await.unwrap();
                }
            })
        };

        let observer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for _ in 0..200 {
                    let counts = queue.counts();
                    assert!(counts.occupancy <= 8);
                    assert!(counts.consumed_total <= counts.produced_total);
                    assert_eq!(
                        counts.produced_total - counts.consumed_total,
                        counts.occupancy as u64
                    );
                    tokio::task::yield_now().await;
                }
            })
        };

        for expected in 0..ITEMS {
            assert_eq!(queue.pop(&shutdown).await.unwrap(), expected);
        }

        producer.await.unwrap();
        observer.await.unwrap();
        assert_eq!(queue.counts().produced_total, ITEMS);
    }
}
