use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

use crossbeam_channel::Receiver;
use tracing::{debug, error, trace};

use crate::{
    queue::QueueReceiver,
    writer::{PayloadWriter, WriteResult},
};

use super::{ForwarderConfiguration, ResolvedAddr};

/// A connected, connectionless socket.
pub(crate) enum Client {
    Udp(UdpSocket),

    #[cfg(unix)]
    Unixgram(UnixDatagram),
}

impl Client {
    /// Opens a local socket and connects it to the configured remote address.
    pub fn from_forwarder_config(config: &ForwarderConfiguration) -> io::Result<Self> {
        match &config.remote_addr {
            ResolvedAddr::Udp(addrs) => {
                let local_addr = match addrs.first() {
                    Some(SocketAddr::V6(_)) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
                    _ => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
                };
                UdpSocket::bind(local_addr).and_then(|socket| {
                    socket.connect(&addrs[..])?;
                    socket.set_write_timeout(Some(config.write_timeout))?;
                    Ok(Client::Udp(socket))
                })
            }

            #[cfg(unix)]
            ResolvedAddr::Unixgram(path) => UnixDatagram::unbound().and_then(|socket| {
                socket.connect(path)?;
                socket.set_write_timeout(Some(config.write_timeout))?;
                Ok(Client::Unixgram(socket))
            }),
        }
    }

    fn send(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Client::Udp(socket) => socket.send(buf),

            #[cfg(unix)]
            Client::Unixgram(socket) => socket.send(buf),
        }
    }
}

/// Drains the metric queue and writes batched payloads to the transport.
///
/// The forwarder exclusively owns the transport connection. It is closed when [`Forwarder::run`] returns.
pub(crate) struct Forwarder {
    client: Client,
    config: ForwarderConfiguration,
    queue: QueueReceiver,
    shutdown: Receiver<()>,
}

impl Forwarder {
    /// Create a new synchronous `Forwarder`.
    pub fn new(
        config: ForwarderConfiguration,
        client: Client,
        queue: QueueReceiver,
        shutdown: Receiver<()>,
    ) -> Self {
        Forwarder { client, config, queue, shutdown }
    }

    /// Run the forwarder until shutdown is signalled.
    ///
    /// Each iteration blocks for one line, then opportunistically takes whatever else is already queued until either the
    /// queue is empty or a full payload is ready, and then sends everything it has. Lines still in the queue at shutdown
    /// are discarded.
    pub fn run(self) {
        debug!(max_payload_len = self.config.max_payload_len, "Forwarder started.");

        let mut writer = PayloadWriter::new(self.config.max_payload_len);

        while let Some(line) = self.queue.pop(&self.shutdown) {
            write_line(&mut writer, &line);

            while writer.finalized_payloads() == 0 {
                match self.queue.try_pop() {
                    Some(line) => write_line(&mut writer, &line),
                    None => break,
                }
            }

            self.send_payloads(&mut writer);
        }

        debug!("Forwarder stopped, closing transport.");
    }

    fn send_payloads(&self, writer: &mut PayloadWriter) {
        let mut payloads = writer.payloads();
        trace!(num_payloads = payloads.len(), "Sending payloads.");

        while let Some(payload) = payloads.next_payload() {
            match self.client.send(payload) {
                Ok(sent) => trace!(payload_len = payload.len(), sent, "Sent payload."),
                Err(e) => error!(error = %e, payload_len = payload.len(), "Failed to send payload."),
            }
        }
    }
}

fn write_line(writer: &mut PayloadWriter, line: &str) {
    if writer.write_line(line) == WriteResult::Dropped {
        debug!(line_len = line.len(), "Metric line exceeds maximum payload length, dropping.");
    }
}
