//! HTTP response decompression middleware for Tower.
//!
//! This crate provides a Tower layer that buffers downstream responses and,
//! when they are gzip-encoded, replaces them with the decompressed body before
//! they reach the client.
//!
//! # Example
//!
//! ```ignore
//! use http_response_ungzip::UngzipLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(UngzipLayer::new().paths(["/api"]).max_size(1024 * 1024))
//!     .service(my_service);
//! ```
//!
//! The layer can also be built from declarative settings, either
//! deserialized ([`UngzipConfig`]) or written as a directive block:
//!
//! ```ignore
//! let config = http_response_ungzip::parse_directive(
//!     "ungzip {\n    path /api\n    content_type text/ application/json\n}",
//! )?;
//! let layer = UngzipLayer::from_config(config)?;
//! ```
//!
//! # Decompression Rules
//!
//! Requests whose path matches none of the configured prefixes are passed
//! through without buffering. Otherwise the whole response is buffered and
//! replayed unchanged when:
//! - `Content-Encoding` does not contain `gzip` (case-insensitive)
//! - `Content-Type` does not start with any configured content-type prefix
//! - The compressed body is larger than `max_size` (default: 10 MiB)
//! - The body is not a valid, complete gzip stream
//!
//! # Response Modifications
//!
//! When decompression is applied:
//! - `Content-Encoding` header is removed
//! - `Content-Length` header is set to the decompressed size
//!
//! Every response carries an [`Outcome`] extension describing the decision.

#![deny(missing_docs)]

mod body;
mod config;
mod directive;
mod error;
mod future;
mod gzip;
mod layer;
mod outcome;
mod pool;
mod service;

pub use body::UngzipBody;
pub use config::{DEFAULT_MAX_SIZE, Policy, UngzipConfig};
pub use directive::{DIRECTIVE_NAME, parse_directive};
pub use error::{ConfigError, Error};
pub use future::ResponseFuture;
pub use layer::UngzipLayer;
pub use outcome::{DeclineReason, Outcome};
pub use pool::{BufferPool, Pooled, Recycle};
pub use service::UngzipService;
