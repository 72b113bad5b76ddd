use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::trace;

/// Creates a fixed-capacity queue of formatted lines.
///
/// The capacity never changes after construction. A capacity of zero is raised to one, since a rendezvous channel
/// would drop every line that the forwarder is not already waiting on.
pub fn metric_queue(capacity: usize) -> (MetricQueue, QueueReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (MetricQueue { tx }, QueueReceiver { rx })
}

/// Producer side of the metric queue.
///
/// Cheap to clone, and safe to push into from any number of threads.
#[derive(Clone)]
pub struct MetricQueue {
    tx: Sender<String>,
}

impl MetricQueue {
    /// Attempts to enqueue a line without blocking.
    ///
    /// If the queue is full, or nothing is consuming it anymore, the line is discarded.
    pub fn push(&self, line: String) {
        match self.tx.try_send(line) {
            Ok(()) => {}
            Err(TrySendError::Full(line)) => trace!(line = line.trim_end(), "Metric queue full, dropping line."),
            Err(TrySendError::Disconnected(_)) => trace!("Metric queue disconnected, dropping line."),
        }
    }

    /// Returns the fixed capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(1)
    }
}

/// Consumer side of the metric queue.
pub struct QueueReceiver {
    rx: Receiver<String>,
}

impl QueueReceiver {
    /// Waits for the next line.
    ///
    /// Returns `None` once `shutdown` is signalled (sent to, or all of its senders dropped) or once every producer is
    /// gone.
    pub fn pop(&self, shutdown: &Receiver<()>) -> Option<String> {
        select! {
            recv(shutdown) -> _ => None,
            recv(self.rx) -> line => line.ok(),
        }
    }

    /// Takes the next line if one is immediately available.
    pub fn try_pop(&self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use crossbeam_channel::bounded;

    use super::metric_queue;

    #[test]
    fn push_full_queue() {
        let (queue, rx) = metric_queue(1);
        queue.push("full".to_string());
        queue.push("omit".to_string());

        assert_eq!(rx.try_pop().as_deref(), Some("full"));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn drops_only_overflow() {
        let (queue, rx) = metric_queue(3);
        for i in 0..10 {
            queue.push(format!("line{i}"));
        }

        let drained = std::iter::from_fn(|| rx.try_pop()).collect::<Vec<_>>();
        assert_eq!(drained, ["line0", "line1", "line2"]);
    }

    #[test]
    fn zero_capacity_is_raised() {
        let (queue, rx) = metric_queue(0);
        assert_eq!(queue.capacity(), 1);

        queue.push("kept".to_string());
        assert_eq!(rx.try_pop().as_deref(), Some("kept"));
    }

    #[test]
    fn push_after_consumer_gone() {
        let (queue, rx) = metric_queue(4);
        drop(rx);
        queue.push("nobody home".to_string());
    }

    #[test]
    fn pop_returns_queued_line() {
        let (queue, rx) = metric_queue(4);
        let (_shutdown_tx, shutdown_rx) = bounded::<()>(0);

        queue.push("a:1.000000|c\n".to_string());
        assert_eq!(rx.pop(&shutdown_rx).as_deref(), Some("a:1.000000|c\n"));
    }

    #[test]
    fn pop_unblocks_on_shutdown() {
        let (_queue, rx) = metric_queue(4);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let handle = thread::spawn(move || rx.pop(&shutdown_rx));
        thread::sleep(Duration::from_millis(20));
        drop(shutdown_tx);

        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn pop_unblocks_when_producers_gone() {
        let (queue, rx) = metric_queue(4);
        let (_shutdown_tx, shutdown_rx) = bounded::<()>(0);

        drop(queue);
        assert_eq!(rx.pop(&shutdown_rx), None);
    }
}
