//! Work queue with task-count join
//!
//! `WorkQueue` is a FIFO channel shared by the coordinator and its workers.
//! Every `put` increments a pending count and every `mark_done` decrements
//! it; `join` blocks until the count returns to zero. Each item is numbered
//! in `put` order, so a single producer's submission order survives however
//! the items are spread over consumers.
//!
//! Workers should not call `get`/`mark_done` by hand. [`WorkQueue::take`]
//! returns a [`Task`] guard that marks the item done when dropped, on every
//! exit path including an early `?` return or a panic unwind. That is what
//! keeps a failing worker from leaving `join` blocked forever.
//!
//! # Example
//!
//! ```
//! use hmmpool::queue::{WorkItem, WorkQueue};
//!
//! let queue = WorkQueue::new();
//! queue.put(WorkItem::Query(7)).unwrap();
//! queue.put(WorkItem::Sentinel).unwrap();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| loop {
//!         let task = queue.take().unwrap();
//!         if task.is_sentinel() {
//!             break;
//!         }
//!     });
//!     queue.join().unwrap();
//! });
//! assert_eq!(queue.pending(), 0);
//! ```

pub mod cancel;

pub use cancel::CancelToken;

use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Default interval at which `join` re-checks the cancel token
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A unit of queued work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<T> {
    /// A payload to process
    Query(T),
    /// No more work for the worker that receives this
    Sentinel,
}

impl<T> WorkItem<T> {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, WorkItem::Sentinel)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("work queue was cancelled")]
    Cancelled,

    #[error("mark_done() called more times than items were put")]
    TooManyDone,
}

/// An item in transit, with its position in `put` order
#[derive(Debug)]
struct Envelope<T> {
    index: usize,
    item: WorkItem<T>,
}

/// Thread-safe FIFO with blocking retrieval and drain wait
#[derive(Debug)]
pub struct WorkQueue<T> {
    sender: Sender<Envelope<T>>,
    receiver: Receiver<Envelope<T>>,
    capacity: Option<usize>,
    next_index: AtomicUsize,
    pending: Mutex<usize>,
    drained: Condvar,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl<T> WorkQueue<T> {
    /// Create an unbounded queue; `put` never blocks
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self::from_parts(sender, receiver, None)
    }

    /// Create a queue holding at most `capacity` items; `put` blocks while full
    ///
    /// A capacity of zero is raised to one.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = channel::bounded(capacity);
        Self::from_parts(sender, receiver, Some(capacity))
    }

    fn from_parts(
        sender: Sender<Envelope<T>>,
        receiver: Receiver<Envelope<T>>,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            sender,
            receiver,
            capacity,
            next_index: AtomicUsize::new(0),
            pending: Mutex::new(0),
            drained: Condvar::new(),
            cancel: CancelToken::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Share an externally owned cancel token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// How often a blocked `join` re-checks the cancel token
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append an item
    ///
    /// The item counts as pending until a consumer marks it done. In bounded
    /// mode this blocks while the queue is full.
    ///
    /// # Arguments
    ///
    /// * `item` - A query, or a sentinel telling one consumer to stop
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Cancelled` if the queue is cancelled before or
    /// while the item is being added. A rejected item is not counted.
    ///
    /// # Example
    ///
    /// ```
    /// use hmmpool::queue::{WorkItem, WorkQueue};
    ///
    /// let queue = WorkQueue::bounded(2);
    /// queue.put(WorkItem::Query("q1")).unwrap();
    /// queue.put(WorkItem::Sentinel).unwrap();
    /// assert_eq!(queue.pending(), 2);
    ///
    /// queue.cancel();
    /// assert!(queue.put(WorkItem::Query("q2")).is_err());
    /// ```
    pub fn put(&self, item: WorkItem<T>) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        // Count first so a fast consumer can never drive the count negative
        *self.lock_pending() += 1;

        let envelope = Envelope {
            index: self.next_index.fetch_add(1, Ordering::Relaxed),
            item,
        };
        let sent = channel::select! {
            send(self.sender, envelope) -> res => res.is_ok(),
            recv(self.cancel.signal()) -> _ => false,
        };

        if !sent {
            self.release_one();
            return Err(QueueError::Cancelled);
        }
        Ok(())
    }

    /// Block until an item is available
    ///
    /// The caller owes one `mark_done` for every item retrieved; prefer
    /// [`WorkQueue::take`], which pays it automatically.
    ///
    /// # Returns
    ///
    /// The oldest item not yet retrieved by any consumer.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Cancelled` once the queue has been cancelled,
    /// including while blocked.
    ///
    /// # Example
    ///
    /// ```
    /// use hmmpool::queue::{WorkItem, WorkQueue};
    ///
    /// let queue = WorkQueue::new();
    /// queue.put(WorkItem::Query(1)).unwrap();
    /// assert_eq!(queue.get().unwrap(), WorkItem::Query(1));
    /// queue.mark_done().unwrap();
    /// ```
    pub fn get(&self) -> Result<WorkItem<T>, QueueError> {
        self.receive().map(|envelope| envelope.item)
    }

    /// Get the next item wrapped in a guard that marks it done on drop
    pub fn take(&self) -> Result<Task<'_, T>, QueueError> {
        let envelope = self.receive()?;
        Ok(Task {
            index: envelope.index,
            item: envelope.item,
            queue: self,
        })
    }

    fn receive(&self) -> Result<Envelope<T>, QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        channel::select! {
            recv(self.receiver) -> envelope => envelope.map_err(|_| QueueError::Cancelled),
            recv(self.cancel.signal()) -> _ => Err(QueueError::Cancelled),
        }
    }

    /// Mark one previously retrieved item as finished
    pub fn mark_done(&self) -> Result<(), QueueError> {
        let mut pending = self.lock_pending();
        if *pending == 0 {
            return Err(QueueError::TooManyDone);
        }
        *pending -= 1;
        if *pending == 0 {
            self.drained.notify_all();
        }
        Ok(())
    }

    /// Block until every `put` has a matching `mark_done`
    ///
    /// The cancel token is re-checked every poll interval so that a
    /// cancellation from outside the queue is seen.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Cancelled` if the queue is cancelled while items
    /// are still pending.
    ///
    /// # Example
    ///
    /// ```
    /// use hmmpool::queue::{QueueError, WorkItem, WorkQueue};
    ///
    /// let queue = WorkQueue::new();
    /// queue.join().unwrap();
    ///
    /// queue.put(WorkItem::Query(1)).unwrap();
    /// queue.cancel();
    /// assert_eq!(queue.join(), Err(QueueError::Cancelled));
    /// ```
    pub fn join(&self) -> Result<(), QueueError> {
        let mut pending = self.lock_pending();
        loop {
            if *pending == 0 {
                return Ok(());
            }
            if self.cancel.is_cancelled() {
                return Err(QueueError::Cancelled);
            }
            pending = self
                .drained
                .wait_timeout(pending, self.poll_interval)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Cancel the queue, waking every blocked `get`, `put` and `join`
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            tracing::debug!("work queue cancelled");
        }
        let _pending = self.lock_pending();
        self.drained.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Number of items put but not yet marked done
    pub fn pending(&self) -> usize {
        *self.lock_pending()
    }

    /// Number of items waiting to be retrieved
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    fn release_one(&self) {
        let mut pending = self.lock_pending();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A retrieved item together with its completion obligation
///
/// Dropping the task calls `mark_done` on the queue it came from. If the
/// drop happens during a panic unwind the queue is cancelled as well, so the
/// coordinator stops waiting for work that will not be processed.
#[derive(Debug)]
pub struct Task<'q, T> {
    index: usize,
    item: WorkItem<T>,
    queue: &'q WorkQueue<T>,
}

impl<T> Task<'_, T> {
    pub fn item(&self) -> &WorkItem<T> {
        &self.item
    }

    /// Position of the item in `put` order, starting at 0
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_sentinel(&self) -> bool {
        self.item.is_sentinel()
    }
}

impl<T> Drop for Task<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.queue.cancel();
        }
        if let Err(e) = self.queue.mark_done() {
            tracing::error!("work queue bookkeeping violated: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let queue = WorkQueue::new();
        for i in 0..5 {
            queue.put(WorkItem::Query(i)).unwrap();
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.pending(), 5);

        for i in 0..5 {
            assert_eq!(queue.get().unwrap(), WorkItem::Query(i));
        }
        assert!(queue.is_empty());
        // Retrieval alone does not complete anything
        assert_eq!(queue.pending(), 5);
    }

    #[test]
    fn test_mark_done_counts_down() {
        let queue = WorkQueue::new();
        queue.put(WorkItem::Query(1)).unwrap();
        queue.put(WorkItem::Sentinel).unwrap();

        queue.get().unwrap();
        queue.mark_done().unwrap();
        assert_eq!(queue.pending(), 1);

        queue.get().unwrap();
        queue.mark_done().unwrap();
        assert_eq!(queue.pending(), 0);
        queue.join().unwrap();
    }

    #[test]
    fn test_too_many_done() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        assert_eq!(queue.mark_done(), Err(QueueError::TooManyDone));
    }

    #[test]
    fn test_join_on_empty_queue_returns() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        queue.join().unwrap();
    }

    #[test]
    fn test_task_guard_marks_done() {
        let queue = WorkQueue::new();
        queue.put(WorkItem::Query("a")).unwrap();
        {
            let task = queue.take().unwrap();
            assert_eq!(task.item(), &WorkItem::Query("a"));
            assert_eq!(queue.pending(), 1);
        }
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_task_index_follows_put_order() {
        let queue = WorkQueue::new();
        for name in ["a", "b", "c"] {
            queue.put(WorkItem::Query(name)).unwrap();
        }
        queue.put(WorkItem::Sentinel).unwrap();

        let indices: Vec<(usize, bool)> = (0..4)
            .map(|_| {
                let task = queue.take().unwrap();
                (task.index(), task.is_sentinel())
            })
            .collect();
        assert_eq!(indices, vec![(0, false), (1, false), (2, false), (3, true)]);
    }

    #[test]
    fn test_task_guard_marks_done_on_error_path() {
        fn process(queue: &WorkQueue<u32>) -> Result<(), String> {
            let task = queue.take().map_err(|e| e.to_string())?;
            if let WorkItem::Query(n) = task.item() {
                if *n == 13 {
                    return Err("unlucky".to_string());
                }
            }
            Ok(())
        }

        let queue = WorkQueue::new();
        queue.put(WorkItem::Query(13)).unwrap();
        assert!(process(&queue).is_err());
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_task_guard_marks_done_and_cancels_on_panic() {
        let queue = WorkQueue::new();
        queue.put(WorkItem::Query(1)).unwrap();
        queue.put(WorkItem::Query(2)).unwrap();

        std::thread::scope(|s| {
            let handle = s.spawn(|| {
                let _task = queue.take().unwrap();
                panic!("engine exploded");
            });
            assert!(handle.join().is_err());
        });

        assert_eq!(queue.pending(), 1);
        assert!(queue.is_cancelled());
        assert_eq!(queue.join(), Err(QueueError::Cancelled));
    }

    #[test]
    fn test_exactly_once_delivery_across_consumers() {
        let queue: WorkQueue<usize> = WorkQueue::new();
        let consumers = 4;
        let items = 200;
        let seen: Vec<AtomicUsize> = (0..items).map(|_| AtomicUsize::new(0)).collect();

        std::thread::scope(|s| {
            for _ in 0..consumers {
                s.spawn(|| loop {
                    let task = queue.take().unwrap();
                    match task.item() {
                        WorkItem::Query(i) => {
                            seen[*i].fetch_add(1, Ordering::SeqCst);
                        }
                        WorkItem::Sentinel => break,
                    }
                });
            }
            for i in 0..items {
                queue.put(WorkItem::Query(i)).unwrap();
            }
            for _ in 0..consumers {
                queue.put(WorkItem::Sentinel).unwrap();
            }
            queue.join().unwrap();
        });

        assert!(seen.iter().all(|c| c.load(Ordering::SeqCst) == 1));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_cancel_wakes_blocked_get() {
        let queue: WorkQueue<u32> = WorkQueue::new();
        std::thread::scope(|s| {
            let handle = s.spawn(|| queue.get());
            std::thread::sleep(Duration::from_millis(20));
            queue.cancel();
            assert_eq!(handle.join().unwrap(), Err(QueueError::Cancelled));
        });
    }

    #[test]
    fn test_external_cancel_aborts_join() {
        let token = CancelToken::new();
        let queue = WorkQueue::new()
            .with_cancel_token(token.clone())
            .with_poll_interval(Duration::from_millis(5));
        queue.put(WorkItem::Query(1)).unwrap();

        let start = Instant::now();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(20));
                token.cancel();
            });
            assert_eq!(queue.join(), Err(QueueError::Cancelled));
        });
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_put_after_cancel_is_rejected() {
        let queue = WorkQueue::new();
        queue.cancel();
        assert_eq!(queue.put(WorkItem::Query(1)), Err(QueueError::Cancelled));
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_bounded_put_blocks_until_consumed() {
        let queue = WorkQueue::bounded(1);
        assert_eq!(queue.capacity(), Some(1));
        queue.put(WorkItem::Query(1)).unwrap();

        std::thread::scope(|s| {
            let producer = s.spawn(|| {
                queue.put(WorkItem::Query(2)).unwrap();
                Instant::now()
            });
            std::thread::sleep(Duration::from_millis(30));
            let consumed_at = Instant::now();
            assert_eq!(queue.get().unwrap(), WorkItem::Query(1));
            let produced_at = producer.join().unwrap();
            assert!(produced_at >= consumed_at);
        });
        assert_eq!(queue.get().unwrap(), WorkItem::Query(2));
    }

    #[test]
    fn test_bounded_put_gives_up_on_cancel() {
        let queue = WorkQueue::bounded(1);
        queue.put(WorkItem::Query(1)).unwrap();

        std::thread::scope(|s| {
            let producer = s.spawn(|| queue.put(WorkItem::Query(2)));
            std::thread::sleep(Duration::from_millis(20));
            queue.cancel();
            assert_eq!(producer.join().unwrap(), Err(QueueError::Cancelled));
        });
        // The rejected item must not be counted as pending
        assert_eq!(queue.pending(), 1);
    }
}
