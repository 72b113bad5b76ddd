use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    builder::{BuildError, StatsdBuilder},
    label::Label,
    line::{format_line, MetricType},
    queue::MetricQueue,
};

/// The set of recording operations a metrics sink provides.
///
/// Implementations must never block the caller on network I/O or on internal buffering: every recording operation
/// either hands the metric off immediately, or drops it.
pub trait MetricSink: Send + Sync {
    /// Sets a gauge to the given value.
    fn set_gauge(&self, key: &[&str], value: f32);

    /// Sets a labeled gauge to the given value.
    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);

    /// Sets a gauge from a 64-bit value.
    fn set_precision_gauge(&self, key: &[&str], value: f64);

    /// Sets a labeled gauge from a 64-bit value.
    fn set_precision_gauge_with_labels(&self, key: &[&str], value: f64, labels: &[Label]);

    /// Emits a raw key/value pair.
    fn emit_key(&self, key: &[&str], value: f32);

    /// Increments a counter by the given value.
    fn incr_counter(&self, key: &[&str], value: f32);

    /// Increments a labeled counter by the given value.
    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);

    /// Records a timing sample.
    fn add_sample(&self, key: &[&str], value: f32);

    /// Records a labeled timing sample.
    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]);

    /// Stops the sink and releases its transport.
    ///
    /// Blocks until the transport is released, even when another thread is already shutting the sink down. Calling
    /// this more than once has no further effect.
    fn shutdown(&self);
}

struct ForwarderHandle {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
}

/// A sink that sends metrics to a statsd server.
///
/// Every recording call formats its line on the calling thread and pushes it onto a bounded queue without blocking. A
/// background forwarder thread drains the queue and writes batched datagrams to the remote server. When the queue is
/// full, new lines are dropped.
pub struct StatsdSink {
    remote_address: String,
    queue: MetricQueue,
    forwarder: Mutex<Option<ForwarderHandle>>,
}

impl StatsdSink {
    /// Creates a sink sending to `addr` with the default configuration.
    ///
    /// See [`StatsdBuilder`] for the accepted address formats and the defaults.
    ///
    /// # Errors
    ///
    /// If the address cannot be parsed or resolved, or the local socket cannot be opened, an error is returned and no
    /// background thread is left running.
    pub fn new<A>(addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        StatsdBuilder::default().with_remote_address(addr)?.build()
    }

    pub(crate) fn from_parts(
        remote_address: String,
        queue: MetricQueue,
        shutdown: Sender<()>,
        thread: JoinHandle<()>,
    ) -> Self {
        StatsdSink {
            remote_address,
            queue,
            forwarder: Mutex::new(Some(ForwarderHandle { shutdown, thread })),
        }
    }

    /// Returns the remote address, exactly as it was configured.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Returns the fixed capacity of the internal queue.
    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Returns `true` once [`MetricSink::shutdown`] has completed.
    pub fn is_shutdown(&self) -> bool {
        self.forwarder.lock().is_none()
    }

    fn push(&self, key: &[&str], labels: &[Label], value: f64, metric_type: MetricType) {
        self.queue.push(format_line(key, labels, value, metric_type));
    }
}

impl MetricSink for StatsdSink {
    fn set_gauge(&self, key: &[&str], value: f32) {
        self.push(key, &[], f64::from(value), MetricType::Gauge);
    }

    fn set_gauge_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.push(key, labels, f64::from(value), MetricType::Gauge);
    }

    fn set_precision_gauge(&self, key: &[&str], value: f64) {
        self.push(key, &[], value, MetricType::Gauge);
    }

    fn set_precision_gauge_with_labels(&self, key: &[&str], value: f64, labels: &[Label]) {
        self.push(key, labels, value, MetricType::Gauge);
    }

    fn emit_key(&self, key: &[&str], value: f32) {
        self.push(key, &[], f64::from(value), MetricType::KeyValue);
    }

    fn incr_counter(&self, key: &[&str], value: f32) {
        self.push(key, &[], f64::from(value), MetricType::Counter);
    }

    fn incr_counter_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.push(key, labels, f64::from(value), MetricType::Counter);
    }

    fn add_sample(&self, key: &[&str], value: f32) {
        self.push(key, &[], f64::from(value), MetricType::Timing);
    }

    fn add_sample_with_labels(&self, key: &[&str], value: f32, labels: &[Label]) {
        self.push(key, labels, f64::from(value), MetricType::Timing);
    }

    fn shutdown(&self) {
        // Held until the join finishes, so concurrent callers also wait for the transport to close.
        let mut forwarder = self.forwarder.lock();
        let Some(ForwarderHandle { shutdown, thread }) = forwarder.take() else {
            return;
        };

        drop(shutdown);
        if thread.join().is_err() {
            error!(remote_address = %self.remote_address, "Forwarder thread panicked.");
        } else {
            debug!(remote_address = %self.remote_address, "Sink shut down.");
        }
    }
}
