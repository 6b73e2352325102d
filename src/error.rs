use thiserror::Error;

/// Errors surfaced by the market data engine.
///
/// Network and decode failures are deliberately distinct: a 200 response
/// that fails to parse points at an upstream contract change, not a
/// transient fault.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Transport failure or non-200 status from an upstream API. The status
    /// code is kept when one was received; the message carries the reason
    /// text and the request URL.
    #[error("request failed: {message}")]
    Network { status: Option<u16>, message: String },

    /// A successfully fetched payload that does not match the expected shape.
    #[error("failed to decode {context}: {message}")]
    Decode {
        context: &'static str,
        message: String,
    },

    /// Requested currency code is absent from the loaded rate table.
    #[error("exchange rate for {0} not available")]
    MissingRate(String),

    /// Item name not present in the coin directory.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = MarketError> = std::result::Result<T, E>;
