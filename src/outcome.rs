/// What the middleware did with a response.
///
/// Every response leaving [`UngzipService`](crate::UngzipService) carries
/// one of these in its extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request path matched no configured prefix; the response was not buffered.
    Excluded,
    /// The buffered response was not gzip-encoded and was replayed unchanged.
    NotGzip,
    /// The buffered gzip response was replayed unchanged.
    Declined(DeclineReason),
    /// The body was decompressed and the headers rewritten.
    Decompressed,
}

/// Why a gzip-encoded response was left compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// `Content-Type` matched no configured prefix.
    ContentType,
    /// The compressed body was larger than the configured maximum.
    TooLarge,
    /// The body was not a complete, valid gzip stream.
    InvalidGzip,
}

impl Outcome {
    /// Returns true if the response body was replaced.
    pub fn is_decompressed(&self) -> bool {
        matches!(self, Outcome::Decompressed)
    }
}
