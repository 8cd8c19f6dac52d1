//! Outbound status broadcast.

use courier_protocol::StatusEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Fire-and-forget fan-out of [`StatusEvent`]s.
///
/// Subscribers see events in emission order, starting from the moment they
/// subscribe. There is no backlog for late subscribers and no redelivery.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusChannel {
    /// `capacity` is the per-subscriber buffer (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Delivers `event` to the current subscribers and returns how many
    /// there were. Zero subscribers is not an error.
    pub fn emit(&self, event: StatusEvent) -> usize {
        let upload_id = event.upload_id().to_string();
        let status = event.status_code().code();
        let receivers = self.tx.send(event).unwrap_or(0);
        debug!(upload_id = %upload_id, status, receivers, "status emitted");
        receivers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_protocol::ErrorDescriptor;
    use tokio::sync::broadcast::error::TryRecvError;

    fn progress(id: &str, pct: u8) -> StatusEvent {
        StatusEvent::InProgress {
            upload_id: id.into(),
            percentage: pct,
            uploaded_bytes: u64::from(pct),
            total_bytes: 100,
        }
    }

    #[test]
    fn emit_without_subscribers() {
        let channel = StatusChannel::new(8);
        assert_eq!(channel.emit(progress("u1", 0)), 0);
    }

    #[test]
    fn delivers_in_order_to_all_subscribers() {
        let channel = StatusChannel::new(8);
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();

        assert_eq!(channel.emit(progress("u1", 10)), 2);
        channel.emit(StatusEvent::Error {
            upload_id: "u1".into(),
            cause: ErrorDescriptor::cancelled(),
        });

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap(), progress("u1", 10));
            assert!(matches!(rx.try_recv().unwrap(), StatusEvent::Error { .. }));
            assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[test]
    fn late_subscriber_sees_nothing_earlier() {
        let channel = StatusChannel::new(8);
        let _early = channel.subscribe();
        channel.emit(progress("u1", 50));

        let mut late = channel.subscribe();
        assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
        channel.emit(progress("u1", 60));
        assert_eq!(late.try_recv().unwrap(), progress("u1", 60));
    }

    #[test]
    fn zero_capacity_is_bumped() {
        let channel = StatusChannel::new(0);
        let mut rx = channel.subscribe();
        channel.emit(progress("u1", 1));
        assert_eq!(rx.try_recv().unwrap(), progress("u1", 1));
        assert_eq!(channel.subscriber_count(), 1);
    }
}
