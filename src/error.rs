use std::io;

/// Failures that end a session before any probe is sent.
#[derive(Debug)]
pub enum PingError {
    TransportUnavailable(io::Error),
    HostResolution { host: String, reason: String },
}

impl std::fmt::Display for PingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingError::TransportUnavailable(e) => write!(
                f,
                "Failed to create raw socket: {}. Root or CAP_NET_RAW may be required.",
                e
            ),
            PingError::HostResolution { host, reason } => {
                write!(f, "Unknown host: {} ({})", host, reason)
            }
        }
    }
}

impl std::error::Error for PingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PingError::TransportUnavailable(e) => Some(e),
            PingError::HostResolution { .. } => None,
        }
    }
}
