//! Errors surfaced by the node core.

use crate::network::error::Error as NetworkError;

/// Errors returned by node components.
///
/// Connectivity loss, malformed payloads and publish failures are absorbed
/// inside the components and only logged; this type covers what a caller can
/// act on.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// A transport or protocol error.
    Network(NetworkError),
    /// A bounded retry policy gave up before the link came up.
    RetriesExhausted,
    /// An outbound payload did not fit its buffer.
    Encode,
    /// A configuration value does not fit its fixed-size field, or is invalid.
    Config,
    /// The loop's component list is full.
    TooManyComponents,
}

impl From<NetworkError> for Error {
    fn from(error: NetworkError) -> Self {
        Error::Network(error)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Network(e) => write!(f, "network: {}", e),
            Error::RetriesExhausted => f.write_str("retries exhausted"),
            Error::Encode => f.write_str("payload encoding failed"),
            Error::Config => f.write_str("invalid configuration"),
            Error::TooManyComponents => f.write_str("too many components"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Network(e) => defmt::write!(f, "Network({})", e),
            Error::RetriesExhausted => defmt::write!(f, "RetriesExhausted"),
            Error::Encode => defmt::write!(f, "Encode"),
            Error::Config => defmt::write!(f, "Config"),
            Error::TooManyComponents => defmt::write!(f, "TooManyComponents"),
        }
    }
}
