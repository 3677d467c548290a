use crate::error::SendError;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

/// The emitting end of an event channel.
pub trait EventSink: Send + 'static {
    /// Sends an event without waiting for the receiver.
    fn send_event(&self, event: Value) -> Result<(), SendError>;

    /// Sends an event,
    /// logging a warning if it cannot be delivered.
    ///
    /// This should be used where a lost event is not worth failing for.
    #[inline]
    fn send_or_warn(&self, event: Value) {
        if let Err(err) = self.send_event(event) {
            warn!("Failed to send event: {err}");
        }
    }
}

impl EventSink for mpsc::UnboundedSender<Value> {
    #[inline]
    fn send_event(&self, event: Value) -> Result<(), SendError> {
        self.send(event).map_err(|_| SendError::Closed)
    }
}

impl EventSink for mpsc::Sender<Value> {
    #[inline]
    fn send_event(&self, event: Value) -> Result<(), SendError> {
        self.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_closed() {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        drop(rx);

        assert_eq!(tx.send_event(Value::from("full")), Err(SendError::Closed));
    }

    #[test]
    fn bounded_full() {
        let (tx, mut rx) = mpsc::channel::<Value>(1);

        assert_eq!(tx.send_event(Value::from("charging")), Ok(()));
        assert_eq!(tx.send_event(Value::from("full")), Err(SendError::Full));
        assert_eq!(rx.try_recv().ok(), Some(Value::from("charging")));
    }

    #[test]
    fn send_or_warn_ignores_closed() {
        let (tx, rx) = mpsc::channel::<Value>(1);
        drop(rx);

        tx.send_or_warn(Value::from("full"));
    }
}
