use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::MessageId;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingDelete {
    due_at: Instant,
    chat_id: ChatId,
    message_id: MessageId,
}

impl Ord for PendingDelete {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then(self.chat_id.0.cmp(&other.chat_id.0))
            .then(self.message_id.0.cmp(&other.message_id.0))
    }
}

impl PartialOrd for PendingDelete {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Supervised replacement for fire-and-forget sleep-then-delete tasks:
/// scheduled deletions go through one bounded channel into a single
/// supervisor task holding a due-time min-heap. Pending work is countable
/// and capped; a full queue drops the new deletion with a warning.
#[derive(Clone)]
pub struct DeleteQueue {
    sender: mpsc::Sender<PendingDelete>,
    pending: Arc<AtomicUsize>,
}

impl DeleteQueue {
    pub fn start(bot: Bot, capacity: usize) -> Self {
        Self::start_with(capacity, move |chat_id, message_id| {
            let bot = bot.clone();
            async move {
                bot.delete_message(chat_id, message_id).await?;
                Ok(())
            }
        })
    }

    /// `delete_fn` is the transport seam; tests drive the supervisor with a
    /// recording closure instead of a live bot.
    pub fn start_with<F, Fut>(capacity: usize, delete_fn: F) -> Self
    where
        F: Fn(ChatId, MessageId) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity);
        let pending = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_delete_loop(receiver, delete_fn, pending.clone()));
        info!("Delete queue started (capacity {capacity})");
        DeleteQueue { sender, pending }
    }

    pub fn schedule(&self, chat_id: ChatId, message_id: MessageId, delay: Duration) {
        let item = PendingDelete {
            due_at: Instant::now() + delay,
            chat_id,
            message_id,
        };
        match self.sender.try_send(item) {
            Ok(()) => {
                self.pending.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                warn!(
                    "Delete queue full, dropping deletion of message {} in chat {}: {err}",
                    message_id.0, chat_id.0
                );
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

async fn run_delete_loop<F, Fut>(
    mut receiver: mpsc::Receiver<PendingDelete>,
    delete_fn: F,
    pending: Arc<AtomicUsize>,
) where
    F: Fn(ChatId, MessageId) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mut heap: BinaryHeap<Reverse<PendingDelete>> = BinaryHeap::new();
    let mut channel_open = true;

    while channel_open || !heap.is_empty() {
        let next_due = heap.peek().map(|Reverse(item)| item.due_at);
        tokio::select! {
            received = receiver.recv(), if channel_open => match received {
                Some(item) => heap.push(Reverse(item)),
                None => channel_open = false,
            },
            _ = sleep_until_due(next_due), if next_due.is_some() => {
                if let Some(Reverse(item)) = heap.pop() {
                    pending.fetch_sub(1, Ordering::SeqCst);
                    // Already-deleted messages and missing permissions are
                    // expected outcomes, not failures.
                    if let Err(err) = delete_fn(item.chat_id, item.message_id).await {
                        debug!(
                            "Deletion of message {} in chat {} was a no-op: {err}",
                            item.message_id.0, item.chat_id.0
                        );
                    }
                }
            }
        }
    }

    info!("Delete queue supervisor stopped");
}

async fn sleep_until_due(due: Option<Instant>) {
    match due {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
