//! Order book event feed.
//!
//! A bot subscribes to a market and receives `BookUpdate`s until the feed
//! is closed. The trading engine owns the sending side.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Epoch boundary notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEpoch {
    /// Epoch that just started.
    pub current: u64,
    /// Epoch that was just resolved.
    pub resolved: u64,
}

/// Minimal order as carried in book updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniOrder {
    pub token: String,
    pub sell: bool,
    /// Message rate.
    pub msg_rate: u64,
    /// Quantity in base atoms.
    pub qty_atomic: u64,
    pub epoch: u64,
}

/// One event on the book feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum BookUpdate {
    ResolvedEpoch(ResolvedEpoch),
    BookOrder(MiniOrder),
    EpochOrder(MiniOrder),
    UnbookOrder { token: String },
    UpdateRemaining { token: String, qty_atomic: u64 },
}

/// Receiving end of a book subscription.
#[derive(Debug)]
pub struct BookFeed {
    rx: mpsc::Receiver<BookUpdate>,
}

impl BookFeed {
    /// Create a bounded feed and its sending side.
    pub fn channel(buffer: usize) -> (mpsc::Sender<BookUpdate>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }

    /// Next update, or `None` once the feed is closed and drained.
    pub async fn next(&mut self) -> Option<BookUpdate> {
        self.rx.recv().await
    }

    /// Stop accepting updates. Buffered updates are still delivered.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_delivers_in_order_then_closes() {
        let (tx, mut feed) = BookFeed::channel(8);
        tx.send(BookUpdate::ResolvedEpoch(ResolvedEpoch {
            current: 2,
            resolved: 1,
        }))
        .await
        .unwrap();
        tx.send(BookUpdate::UnbookOrder {
            token: "abc".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        assert!(matches!(
            feed.next().await,
            Some(BookUpdate::ResolvedEpoch(ResolvedEpoch { current: 2, .. }))
        ));
        assert!(matches!(feed.next().await, Some(BookUpdate::UnbookOrder { .. })));
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_close_rejects_new_updates() {
        let (tx, mut feed) = BookFeed::channel(1);
        feed.close();
        let sent = tx
            .send(BookUpdate::ResolvedEpoch(ResolvedEpoch {
                current: 1,
                resolved: 0,
            }))
            .await;
        assert!(sent.is_err());
        assert!(feed.next().await.is_none());
    }

    #[test]
    fn test_update_json_tagging() {
        let update = BookUpdate::ResolvedEpoch(ResolvedEpoch {
            current: 5,
            resolved: 4,
        });
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["action"], "resolved_epoch");
        assert_eq!(json["payload"]["current"], 5);
    }
}
