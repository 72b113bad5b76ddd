use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs as _},
    time::Duration,
};

#[cfg(unix)]
use std::path::PathBuf;

pub mod sync;

#[cfg(unix)]
const UNIXGRAM_SCHEME: &str = "unixgram://";

/// A destination address, as given by the caller.
///
/// Parsing never touches the network: host names are only resolved by [`RemoteAddr::resolve`], when the sink is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RemoteAddr {
    Udp { original: String, host: String, port: Option<u16> },

    #[cfg(unix)]
    Unixgram(PathBuf),
}

impl RemoteAddr {
    /// Returns the transport ID for the remote address, such as `udp` for UDP.
    pub const fn transport_id(&self) -> &'static str {
        match self {
            RemoteAddr::Udp { .. } => "udp",
            #[cfg(unix)]
            RemoteAddr::Unixgram(_) => "uds",
        }
    }

    /// Returns the explicitly configured port, if any.
    pub fn port(&self) -> Option<u16> {
        match self {
            RemoteAddr::Udp { port, .. } => *port,
            #[cfg(unix)]
            RemoteAddr::Unixgram(_) => None,
        }
    }

    /// Resolves the address into something a socket can be connected to.
    ///
    /// When no port was given, `default_port` is used.
    pub fn resolve(&self, default_port: u16) -> Result<ResolvedAddr, String> {
        match self {
            RemoteAddr::Udp { original, host, port } => {
                let port = port.unwrap_or(default_port);
                let addrs = (host.as_str(), port)
                    .to_socket_addrs()
                    .map_err(|e| format!("failed to resolve '{original}': {e}"))?
                    .collect::<Vec<_>>();
                if addrs.is_empty() {
                    return Err(format!("no addresses found for '{original}'"));
                }

                Ok(ResolvedAddr::Udp(addrs))
            }

            #[cfg(unix)]
            RemoteAddr::Unixgram(path) => Ok(ResolvedAddr::Unixgram(path.clone())),
        }
    }
}

impl<'a> TryFrom<&'a str> for RemoteAddr {
    type Error = String;

    fn try_from(addr: &'a str) -> Result<Self, Self::Error> {
        #[cfg(unix)]
        if let Some(path) = addr.strip_prefix(UNIXGRAM_SCHEME) {
            if path.is_empty() {
                return Err("missing socket path after 'unixgram://'".to_string());
            }
            return Ok(RemoteAddr::Unixgram(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = addr.split_once("://") {
            return Err(format!("unsupported scheme '{scheme}'"));
        }

        let (host, port) = split_host_port(addr)?;
        Ok(RemoteAddr::Udp { original: addr.to_string(), host: host.to_string(), port })
    }
}

impl fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteAddr::Udp { original, .. } => f.write_str(original),
            #[cfg(unix)]
            RemoteAddr::Unixgram(path) => write!(f, "{UNIXGRAM_SCHEME}{}", path.display()),
        }
    }
}

/// Splits `host`, `host:port`, `[v6]` or `[v6]:port` into its parts.
///
/// A bare IPv6 address without brackets is taken as a host with no port.
fn split_host_port(addr: &str) -> Result<(&str, Option<u16>), String> {
    if addr.trim().is_empty() {
        return Err("address is empty".to_string());
    }

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, rest) =
            rest.split_once(']').ok_or_else(|| format!("unterminated IPv6 address in '{addr}'"))?;
        match rest {
            "" => (host, None),
            _ => match rest.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(format!("unexpected trailing characters in '{addr}'")),
            },
        }
    } else {
        match addr.matches(':').count() {
            0 => (addr, None),
            1 => addr.split_once(':').map_or((addr, None), |(host, port)| (host, Some(port))),
            _ => (addr, None),
        }
    };

    if host.is_empty() {
        return Err(format!("missing host in '{addr}'"));
    }
    if host.contains(char::is_whitespace) {
        return Err(format!("invalid host '{host}'"));
    }

    let port = port
        .map(|port| port.parse::<u16>().map_err(|_| format!("invalid port '{port}' in '{addr}'")))
        .transpose()?;

    Ok((host, port))
}

/// A remote address that has been resolved at build time.
#[derive(Clone, Debug)]
pub(crate) enum ResolvedAddr {
    Udp(Vec<SocketAddr>),

    #[cfg(unix)]
    Unixgram(PathBuf),
}

/// Forwarder configuration.
#[derive(Clone, Debug)]
pub(crate) struct ForwarderConfiguration {
    pub remote_addr: ResolvedAddr,
    pub max_payload_len: usize,
    pub write_timeout: Duration,
}
