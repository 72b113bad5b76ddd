use std::{io, time::Duration};

use crossbeam_channel::bounded;
use thiserror::Error;
use tracing::debug;

use crate::{
    forwarder::{
        sync::{Client, Forwarder},
        ForwarderConfiguration, RemoteAddr,
    },
    queue::metric_queue,
    sink::StatsdSink,
    writer::SMALLEST_VALID_PAYLOAD,
};

/// Port used when the remote address does not specify one.
pub const DEFAULT_PORT: u16 = 8125;

/// Number of lines the queue holds before new lines are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Largest datagram the forwarder will send.
///
/// Fits in a single Ethernet frame along with IP and UDP headers.
pub const DEFAULT_MAX_PAYLOAD_LEN: usize = 1400;

/// How long the forwarder waits on a single datagram write before giving up on it.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_REMOTE_ADDRESS: &str = "127.0.0.1:8125";

/// Errors that could occur while building a statsd sink.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse or resolve the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the failure.
        reason: String,
    },

    /// Failed to open the local socket, or to connect it to the remote address.
    #[error("failed to connect to '{address}': {source}")]
    Connect {
        /// The remote address, as configured.
        address: String,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Details about the invalid value.
        reason: String,
    },

    /// Failed to spawn the background forwarder thread.
    #[error("failed to spawn background thread for forwarder")]
    Backend,
}

/// Builder for a statsd sink.
pub struct StatsdBuilder {
    remote_addr: RemoteAddr,
    default_port: u16,
    queue_capacity: usize,
    max_payload_len: usize,
    write_timeout: Duration,
}

impl StatsdBuilder {
    /// Set the remote address to send metrics to.
    ///
    /// For UDP, the address can be `<host>` or `<host>:<port>`, where IPv6 hosts with a port are written in brackets
    /// (`[::1]:8125`). When no port is given, the default port is used. For Unix domain sockets, the address is
    /// `unixgram://<path>`.
    ///
    /// The address is only resolved when the sink is built.
    ///
    /// Defaults to `127.0.0.1:8125`.
    ///
    /// # Errors
    ///
    /// If the given address is not able to be parsed as a valid address, an error will be returned indicating the
    /// reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        self.remote_addr = RemoteAddr::try_from(addr.as_ref())
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;
        Ok(self)
    }

    /// Set the port used when the remote address does not specify one.
    ///
    /// Defaults to 8125.
    #[must_use]
    pub fn with_default_port(mut self, port: u16) -> Self {
        self.default_port = port;
        self
    }

    /// Set the capacity of the internal queue.
    ///
    /// Once this many lines are waiting to be sent, further lines are dropped until the forwarder catches up.
    ///
    /// Defaults to 4096.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the maximum payload length.
    ///
    /// Lines are batched into datagrams up to this size. A line that is longer than this by itself is dropped.
    ///
    /// Defaults to 1400 bytes.
    #[must_use]
    pub fn with_maximum_payload_length(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// Set the write timeout for sending payloads.
    ///
    /// When the write timeout is reached, the payload being sent at the time is dropped without retrying.
    ///
    /// Defaults to 1 second.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Builds the sink.
    ///
    /// The remote address is resolved, the local socket is opened, and the background forwarder thread is spawned.
    ///
    /// # Errors
    ///
    /// If the configuration is invalid, the address cannot be resolved, or the socket cannot be opened, an error is
    /// returned and no background thread is left running.
    pub fn build(self) -> Result<StatsdSink, BuildError> {
        if self.queue_capacity == 0 {
            return Err(BuildError::InvalidConfiguration {
                reason: "queue capacity must be greater than zero".to_string(),
            });
        }
        if self.max_payload_len < SMALLEST_VALID_PAYLOAD.len() {
            return Err(BuildError::InvalidConfiguration {
                reason: format!(
                    "maximum payload length must be {} or greater",
                    SMALLEST_VALID_PAYLOAD.len()
                ),
            });
        }

        let address = self.remote_addr.to_string();
        let resolved = self
            .remote_addr
            .resolve(self.default_port)
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;

        let forwarder_config = ForwarderConfiguration {
            remote_addr: resolved,
            max_payload_len: self.max_payload_len,
            write_timeout: self.write_timeout,
        };
        let client = Client::from_forwarder_config(&forwarder_config)
            .map_err(|source| BuildError::Connect { address: address.clone(), source })?;

        let (queue, queue_rx) = metric_queue(self.queue_capacity);
        let (shutdown_tx, shutdown_rx) = bounded(0);
        let forwarder = Forwarder::new(forwarder_config, client, queue_rx, shutdown_rx);

        let thread = std::thread::Builder::new()
            .name("metrics-exporter-statsd-forwarder".to_string())
            .spawn(move || forwarder.run())
            .map_err(|_| BuildError::Backend)?;

        debug!(
            remote_address = %address,
            transport = self.remote_addr.transport_id(),
            port = self.remote_addr.port().unwrap_or(self.default_port),
            queue_capacity = self.queue_capacity,
            "Statsd sink started."
        );

        Ok(StatsdSink::from_parts(address, queue, shutdown_tx, thread))
    }
}

impl Default for StatsdBuilder {
    fn default() -> Self {
        StatsdBuilder {
            remote_addr: RemoteAddr::Udp {
                original: DEFAULT_REMOTE_ADDRESS.to_string(),
                host: "127.0.0.1".to_string(),
                port: Some(DEFAULT_PORT),
            },
            default_port: DEFAULT_PORT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{net::UdpSocket, time::Duration};

    use super::{BuildError, StatsdBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_WRITE_TIMEOUT};
    use crate::sink::MetricSink as _;

    #[test]
    fn default_build() {
        let sink = StatsdBuilder::default().build().unwrap();
        assert_eq!(sink.remote_address(), "127.0.0.1:8125");
        assert_eq!(sink.queue_capacity(), DEFAULT_QUEUE_CAPACITY);
        assert_eq!(StatsdBuilder::default().write_timeout, DEFAULT_WRITE_TIMEOUT);
        sink.shutdown();
    }

    #[test]
    fn custom_queue_capacity() {
        let sink = StatsdBuilder::default().with_queue_capacity(8).build().unwrap();
        assert_eq!(sink.queue_capacity(), 8);
        sink.shutdown();
    }

    #[test]
    fn default_port_order_independent() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
        let port = server.local_addr().unwrap().port();

        // The default port is set after the address, and still has to be the one used.
        let sink = StatsdBuilder::default()
            .with_remote_address("127.0.0.1")
            .unwrap()
            .with_default_port(port)
            .build()
            .unwrap();
        assert_eq!(sink.remote_address(), "127.0.0.1");

        sink.emit_key(&["order"], 1.0);
        let mut buf = [0; 64];
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"order:1.000000|kv\n");

        sink.shutdown();
    }

    #[test]
    fn rejects_invalid_configuration() {
        let result = StatsdBuilder::default().with_queue_capacity(0).build();
        assert!(matches!(result, Err(BuildError::InvalidConfiguration { .. })));

        let result = StatsdBuilder::default().with_maximum_payload_length(2).build();
        assert!(matches!(result, Err(BuildError::InvalidConfiguration { .. })));
    }

    #[test]
    fn rejects_invalid_address() {
        let result = StatsdBuilder::default().with_remote_address("localhost:notaport");
        assert!(matches!(result, Err(BuildError::InvalidRemoteAddress { .. })));

        let err = StatsdBuilder::default().with_remote_address("").err().unwrap();
        assert_eq!(err.to_string(), "invalid remote address: address is empty");
    }
}
