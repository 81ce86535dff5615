use tower::BoxError;

/// Errors surfaced by [`UngzipService`](crate::UngzipService).
///
/// Neither variant produces a response: the downstream failure is handed
/// back to the caller as-is and whatever was buffered so far is dropped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inner service failed before producing a response.
    #[error("downstream service failed")]
    Service(#[source] BoxError),

    /// The inner service's response body failed while it was being buffered.
    #[error("failed to buffer downstream response body")]
    Body(#[source] BoxError),
}

/// Errors raised while loading or validating the middleware configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `max_size` was negative.
    #[error("max_size cannot be negative (got {0})")]
    NegativeMaxSize(i64),

    /// A sub-directive was given without its required argument.
    #[error("line {line}: `{directive}` requires at least one argument")]
    MissingArgument {
        /// 1-based line number.
        line: usize,
        /// The sub-directive missing its argument.
        directive: String,
    },

    /// A sub-directive that takes a single argument was given more.
    #[error("line {line}: unexpected argument `{argument}` after `{directive}`")]
    UnexpectedArgument {
        /// 1-based line number.
        line: usize,
        /// The sub-directive that was given too many arguments.
        directive: String,
        /// The first surplus token.
        argument: String,
    },

    /// `max_size` was not an integer.
    #[error("line {line}: invalid max_size `{value}`")]
    InvalidMaxSize {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: std::num::ParseIntError,
    },

    /// A sub-directive inside a block was not recognised.
    #[error("line {line}: unknown subdirective `{name}`")]
    UnknownSubdirective {
        /// 1-based line number.
        line: usize,
        /// The unrecognised name.
        name: String,
    },

    /// A top-level token other than `ungzip` was found.
    #[error("line {line}: unexpected directive `{name}`, expected `ungzip`")]
    UnexpectedDirective {
        /// 1-based line number.
        line: usize,
        /// The unexpected token.
        name: String,
    },

    /// A `{` block was opened and never closed.
    #[error("line {line}: block opened here is never closed")]
    UnclosedBlock {
        /// 1-based line number of the opening brace.
        line: usize,
    },

    /// A quoted token ran to the end of its line.
    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote {
        /// 1-based line number.
        line: usize,
    },

    /// The TOML document could not be deserialized.
    #[error("invalid TOML configuration")]
    Toml(#[from] toml::de::Error),
}
