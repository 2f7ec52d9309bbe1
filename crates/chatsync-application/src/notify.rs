//! Notifier implementations.

use chatsync_core::notify::{Notice, NoticeLevel, Notifier};
use tokio::sync::mpsc;

/// Emits notices as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(target: "chatsync::notice", "{}", notice.message),
            NoticeLevel::Warning => {
                tracing::warn!(target: "chatsync::notice", "{}", notice.message)
            }
            NoticeLevel::Error => tracing::error!(target: "chatsync::notice", "{}", notice.message),
        }
    }
}

/// Forwards notices to a UI task over an unbounded channel.
///
/// Sending never blocks; notices are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notice>) -> Self {
        Self { tx }
    }

    /// Creates a notifier together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            tracing::trace!("[ChannelNotifier] Receiver dropped, notice discarded");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelNotifier::channel();
        notifier.notify(Notice::warning("Saved locally"));
        notifier.notify(Notice::info("Synced"));

        assert_eq!(rx.try_recv().unwrap(), Notice::warning("Saved locally"));
        assert_eq!(rx.try_recv().unwrap().level, NoticeLevel::Info);
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::channel();
        drop(rx);
        notifier.notify(Notice::error("nobody listening"));
    }
}
