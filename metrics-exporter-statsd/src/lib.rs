//! A non-blocking sink for sending metrics to a [statsd][statsd]-compatible server.
//!
//! [statsd]: https://github.com/statsd/statsd/blob/master/docs/metric_types.md
//!
//! # Usage
//!
//! ```no_run
//! # use metrics_exporter_statsd::{Label, MetricSink, StatsdBuilder, StatsdSink};
//! // The quickest way to get a sink is to point it at a statsd server. The port defaults to 8125 when omitted.
//! let sink = StatsdSink::new("statsd.local").expect("failed to build sink");
//!
//! sink.incr_counter(&["requests", "served"], 1.0);
//! sink.add_sample_with_labels(&["requests", "latency"], 12.5, &[Label::new("route", "index")]);
//!
//! // Flushing happens in the background. Shutting down stops the forwarder and closes the socket.
//! sink.shutdown();
//!
//! // The builder exposes the rest of the configuration, such as the queue capacity.
//! let sink = StatsdBuilder::default()
//!     .with_remote_address("127.0.0.1:9125")
//!     .expect("failed to parse remote address")
//!     .with_queue_capacity(1024)
//!     .build()
//!     .expect("failed to build sink");
//! ```
//!
//! # Wire format
//!
//! Each metric is sent as one newline-terminated line of the form `<name>:<value>|<type>`, where the name is the key
//! segments joined with `.`, the value always carries six fractional digits, and the type is one of `g` (gauge), `c`
//! (counter), `ms` (timing sample) or `kv` (raw key/value). Spaces, colons, pipes and line breaks in
//! names are replaced with underscores.
//!
//! Labels are rendered by appending each label value to the name as an extra segment:
//!
//! ```text
//! SetGaugeWithLabels(["gauge", "val"], 2.0, [("a", "label")])  =>  gauge.val.label:2.000000|g
//! ```
//!
//! # Backpressure
//!
//! Recording a metric never blocks. Lines are formatted on the calling thread and pushed onto a bounded queue, which a
//! single background thread drains, packing as many lines as fit into each datagram. When the queue is full, new lines
//! are dropped. Failed writes are logged and the payload is discarded; delivery is best-effort, as UDP itself is.
//!
//! # Transports
//!
//! UDP is used by default. On Unix platforms, a `unixgram://<path>` address sends datagrams over a Unix domain socket.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{
    BuildError, StatsdBuilder, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_WRITE_TIMEOUT,
};

mod forwarder;

mod key;
pub use self::key::{flatten_key, sanitize_name};

mod label;
pub use self::label::Label;

mod line;
pub use self::line::{format_line, MetricType};

mod queue;

mod sink;
pub use self::sink::{MetricSink, StatsdSink};

mod writer;
