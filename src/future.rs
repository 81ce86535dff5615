use crate::body::UngzipBody;
use crate::config::Policy;
use crate::error::Error;
use crate::gzip;
use crate::outcome::{DeclineReason, Outcome};
use crate::pool::{BufferPool, Pooled};
use bytes::{Buf, Bytes};
use http::response::Parts;
use http::{HeaderMap, Response, header};
use http_body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tower::BoxError;
use tracing::debug;

pin_project! {
    /// Future for ungzip service responses.
    pub struct ResponseFuture<F, B> {
        #[pin]
        state: State<F, B>,
        policy: Arc<Policy>,
        pool: Arc<BufferPool<Vec<u8>>>,
    }
}

pin_project! {
    #[project = StateProj]
    #[project_replace = StateProjReplace]
    enum State<F, B> {
        // Path excluded: hand the downstream response straight back.
        Bypass {
            #[pin]
            inner: F,
        },
        // Waiting for the downstream response head.
        Pending {
            #[pin]
            inner: F,
        },
        // Draining the downstream body into a pooled buffer.
        Collecting {
            parts: Parts,
            #[pin]
            body: B,
            buffer: Pooled<Vec<u8>>,
            trailers: Option<HeaderMap>,
        },
        Done,
    }
}

impl<F, B> ResponseFuture<F, B> {
    pub(crate) fn bypass(inner: F, policy: Arc<Policy>, pool: Arc<BufferPool<Vec<u8>>>) -> Self {
        Self {
            state: State::Bypass { inner },
            policy,
            pool,
        }
    }

    pub(crate) fn buffered(inner: F, policy: Arc<Policy>, pool: Arc<BufferPool<Vec<u8>>>) -> Self {
        Self {
            state: State::Pending { inner },
            policy,
            pool,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
    E: Into<BoxError>,
    B: Body,
    B::Error: Into<BoxError>,
{
    type Output = Result<Response<UngzipBody<B>>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        loop {
            match this.state.as_mut().project() {
                StateProj::Bypass { inner } => {
                    let result = ready!(inner.poll(cx));
                    this.state.set(State::Done);

                    let response = result.map_err(|e| Error::Service(e.into()))?;
                    let (mut parts, body) = response.into_parts();
                    parts.extensions.insert(Outcome::Excluded);
                    return Poll::Ready(Ok(Response::from_parts(
                        parts,
                        UngzipBody::passthrough(body),
                    )));
                }

                StateProj::Pending { inner } => match ready!(inner.poll(cx)) {
                    Ok(response) => {
                        let (parts, body) = response.into_parts();
                        this.state.set(State::Collecting {
                            parts,
                            body,
                            buffer: this.pool.get(),
                            trailers: None,
                        });
                    }
                    Err(e) => {
                        this.state.set(State::Done);
                        let e = e.into();
                        debug!(error = %e, "downstream service failed, nothing to flush");
                        return Poll::Ready(Err(Error::Service(e)));
                    }
                },

                StateProj::Collecting {
                    mut body,
                    buffer,
                    trailers,
                    ..
                } => {
                    while let Some(frame) = ready!(body.as_mut().poll_frame(cx)) {
                        let frame = match frame {
                            Ok(frame) => frame,
                            Err(e) => {
                                // Dropping the state hands the buffer back to the pool.
                                this.state.set(State::Done);
                                let e = e.into();
                                debug!(error = %e, "downstream body failed while buffering");
                                return Poll::Ready(Err(Error::Body(e)));
                            }
                        };

                        match frame.into_data() {
                            Ok(mut data) => {
                                while data.has_remaining() {
                                    let chunk = data.chunk();
                                    buffer.extend_from_slice(chunk);
                                    let len = chunk.len();
                                    data.advance(len);
                                }
                            }
                            Err(frame) => {
                                if let Ok(t) = frame.into_trailers() {
                                    trailers.get_or_insert_with(HeaderMap::new).extend(t);
                                }
                            }
                        }
                    }

                    let StateProjReplace::Collecting {
                        parts,
                        buffer,
                        trailers,
                        ..
                    } = this.state.as_mut().project_replace(State::Done)
                    else {
                        unreachable!("state is Collecting");
                    };

                    let response = finish_response(parts, &buffer, trailers, this.policy, this.pool);
                    return Poll::Ready(Ok(response));
                }

                StateProj::Done => panic!("ResponseFuture polled after completion"),
            }
        }
    }
}

/// Result of running the header, size and decode gates over a buffered response.
enum Decision {
    /// Replay the buffered response unchanged.
    Replay(Outcome),
    /// Replace the body with these decoded bytes.
    Decoded(Pooled<Vec<u8>>),
}

/// Applies the gates to a buffered response and produces the response to flush.
fn finish_response<B>(
    mut parts: Parts,
    buffered: &[u8],
    trailers: Option<HeaderMap>,
    policy: &Policy,
    pool: &Arc<BufferPool<Vec<u8>>>,
) -> Response<UngzipBody<B>> {
    let (outcome, data) = match decide(&parts.headers, buffered, policy, pool) {
        Decision::Decoded(decoded) => {
            parts.headers.remove(header::CONTENT_ENCODING);
            parts
                .headers
                .insert(header::CONTENT_LENGTH, header::HeaderValue::from(decoded.len()));
            debug!(
                size = buffered.len(),
                decoded = decoded.len(),
                "decompressed gzip response"
            );
            (Outcome::Decompressed, Bytes::copy_from_slice(&decoded))
        }
        Decision::Replay(outcome) => (outcome, Bytes::copy_from_slice(buffered)),
    };

    parts.extensions.insert(outcome);
    Response::from_parts(parts, UngzipBody::buffered(data, trailers))
}

fn decide(
    headers: &HeaderMap,
    buffered: &[u8],
    policy: &Policy,
    pool: &Arc<BufferPool<Vec<u8>>>,
) -> Decision {
    if !gzip::is_gzip_encoded(headers) {
        debug!("response is not gzip-encoded, replaying");
        return Decision::Replay(Outcome::NotGzip);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !policy.matches_content_type(content_type) {
        debug!(content_type, "content type not matched, replaying");
        return Decision::Replay(Outcome::Declined(DeclineReason::ContentType));
    }

    if buffered.len() > policy.max_size() {
        debug!(
            size = buffered.len(),
            max_size = policy.max_size(),
            "response too large to decompress, replaying"
        );
        return Decision::Replay(Outcome::Declined(DeclineReason::TooLarge));
    }

    let mut decoded = pool.get();
    if let Err(e) = gzip::decode(buffered, &mut decoded) {
        debug!(error = %e, size = buffered.len(), "invalid gzip body, replaying");
        return Decision::Replay(Outcome::Declined(DeclineReason::InvalidGzip));
    }

    Decision::Decoded(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::GzEncoder};
    use http_body_util::{BodyExt, Full};
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn make_parts<I>(headers: I) -> Parts
    where
        I: IntoIterator<Item = (&'static str, &'static str)>,
    {
        let mut response = Response::new(());
        for (name, value) in headers {
            response
                .headers_mut()
                .append(name, header::HeaderValue::from_static(value));
        }
        response.into_parts().0
    }

    fn finish(parts: Parts, body: &[u8], policy: &Policy) -> Response<UngzipBody<Full<Bytes>>> {
        let pool = Arc::new(BufferPool::new());
        finish_response(parts, body, None, policy, &pool)
    }

    async fn body_bytes(response: Response<UngzipBody<Full<Bytes>>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    fn outcome<B>(response: &Response<B>) -> Outcome {
        *response.extensions().get::<Outcome>().unwrap()
    }

    fn policy(paths: &[&str], content_types: &[&str], max_size: usize) -> Policy {
        let mut policy = Policy::default();
        policy.set_paths(paths.iter().map(|s| s.to_string()).collect());
        policy.set_content_types(content_types.iter().map(|s| s.to_string()).collect());
        policy.set_max_size(max_size);
        policy
    }

    #[tokio::test]
    async fn test_decompresses_gzip() {
        let compressed = gzip(b"hello world");
        let parts = make_parts([
            ("content-encoding", "gzip"),
            ("content-length", "31"),
            ("content-type", "text/plain"),
        ]);
        let response = finish(parts, &compressed, &Policy::default());

        assert_eq!(outcome(&response), Outcome::Decompressed);
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "11");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body_bytes(response).await, Bytes::from("hello world"));
    }

    #[tokio::test]
    async fn test_uppercase_encoding_decompressed() {
        let compressed = gzip(b"hello world");
        let parts = make_parts([("content-encoding", "GZip")]);
        let response = finish(parts, &compressed, &Policy::default());

        assert_eq!(outcome(&response), Outcome::Decompressed);
        assert_eq!(body_bytes(response).await, Bytes::from("hello world"));
    }

    #[tokio::test]
    async fn test_all_content_encoding_values_removed() {
        let compressed = gzip(b"hello world");
        let parts = make_parts([("content-encoding", "gzip"), ("content-encoding", "identity")]);
        let response = finish(parts, &compressed, &Policy::default());

        assert_eq!(outcome(&response), Outcome::Decompressed);
        assert!(response.headers().get_all(header::CONTENT_ENCODING).iter().next().is_none());
    }

    #[tokio::test]
    async fn test_replays_plain_response() {
        let parts = make_parts([("content-type", "text/plain"), ("content-length", "5")]);
        let response = finish(parts, b"hello", &Policy::default());

        assert_eq!(outcome(&response), Outcome::NotGzip);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "5");
        assert_eq!(body_bytes(response).await, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_content_type_mismatch_replays() {
        let compressed = gzip(b"{\"ok\":true}");
        let parts = make_parts([
            ("content-encoding", "gzip"),
            ("content-type", "application/json"),
        ]);
        let response = finish(parts, &compressed, &policy(&[], &["text/"], 1000));

        assert_eq!(
            outcome(&response),
            Outcome::Declined(DeclineReason::ContentType)
        );
        assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(body_bytes(response).await, Bytes::from(compressed));
    }

    #[tokio::test]
    async fn test_missing_content_type_with_prefixes_replays() {
        let compressed = gzip(b"hello");
        let parts = make_parts([("content-encoding", "gzip")]);
        let response = finish(parts, &compressed, &policy(&[], &["text/"], 1000));

        assert_eq!(
            outcome(&response),
            Outcome::Declined(DeclineReason::ContentType)
        );
    }

    #[tokio::test]
    async fn test_content_type_match_decompresses() {
        let compressed = gzip(b"<p>hi</p>");
        let parts = make_parts([
            ("content-encoding", "gzip"),
            ("content-type", "text/html; charset=utf-8"),
        ]);
        let response = finish(parts, &compressed, &policy(&[], &["application/", "text/"], 1000));

        assert_eq!(outcome(&response), Outcome::Decompressed);
        assert_eq!(body_bytes(response).await, Bytes::from("<p>hi</p>"));
    }

    #[tokio::test]
    async fn test_too_large_replays() {
        let compressed = gzip(b"hello world");
        let parts = make_parts([("content-encoding", "gzip")]);
        let limit = compressed.len() - 1;
        let response = finish(parts, &compressed, &policy(&[], &[], limit));

        assert_eq!(outcome(&response), Outcome::Declined(DeclineReason::TooLarge));
        assert_eq!(body_bytes(response).await, Bytes::from(compressed));
    }

    #[tokio::test]
    async fn test_size_equal_to_limit_decompresses() {
        let compressed = gzip(b"hello world");
        let parts = make_parts([("content-encoding", "gzip")]);
        let limit = compressed.len();
        let response = finish(parts, &compressed, &policy(&[], &[], limit));

        assert_eq!(outcome(&response), Outcome::Decompressed);
    }

    #[tokio::test]
    async fn test_max_size_bounds_compressed_size_only() {
        let payload = vec![0u8; 64 * 1024];
        let compressed = gzip(&payload);
        assert!(compressed.len() < 1024);

        let parts = make_parts([("content-encoding", "gzip")]);
        let response = finish(parts, &compressed, &policy(&[], &[], 1024));

        assert_eq!(outcome(&response), Outcome::Decompressed);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "65536");
        assert_eq!(body_bytes(response).await.len(), payload.len());
    }

    #[tokio::test]
    async fn test_invalid_gzip_replays() {
        let garbage = b"\x13\x37not a gzip stream at all".to_vec();
        let parts = make_parts([("content-encoding", "gzip"), ("content-length", "26")]);
        let response = finish(parts, &garbage, &Policy::default());

        assert_eq!(
            outcome(&response),
            Outcome::Declined(DeclineReason::InvalidGzip)
        );
        assert_eq!(response.headers().get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "26");
        assert_eq!(body_bytes(response).await, Bytes::from(garbage));
    }

    #[tokio::test]
    async fn test_truncated_gzip_replays() {
        let compressed = gzip(b"hello world, truncated before the trailer");
        let truncated = compressed[..compressed.len() - 4].to_vec();
        let parts = make_parts([("content-encoding", "gzip")]);
        let response = finish(parts, &truncated, &Policy::default());

        assert_eq!(
            outcome(&response),
            Outcome::Declined(DeclineReason::InvalidGzip)
        );
        assert_eq!(body_bytes(response).await, Bytes::from(truncated));
    }

    #[tokio::test]
    async fn test_empty_gzip_body_replays() {
        let parts = make_parts([("content-encoding", "gzip")]);
        let response = finish(parts, b"", &Policy::default());

        assert_eq!(
            outcome(&response),
            Outcome::Declined(DeclineReason::InvalidGzip)
        );
    }

    #[tokio::test]
    async fn test_pooled_buffer_reuse_has_no_residue() {
        let pool = Arc::new(BufferPool::new());
        let big: Vec<u8> = (0..50_000u32).flat_map(|i| i.to_be_bytes()).collect();

        let parts = make_parts([("content-encoding", "gzip")]);
        let first: Response<UngzipBody<Full<Bytes>>> =
            finish_response(parts, &gzip(&big), None, &Policy::default(), &pool);
        assert_eq!(body_bytes(first).await.len(), big.len());
        assert!(pool.idle() >= 1);

        let parts = make_parts([("content-encoding", "gzip")]);
        let second: Response<UngzipBody<Full<Bytes>>> =
            finish_response(parts, &gzip(b"tiny"), None, &Policy::default(), &pool);
        assert_eq!(second.headers().get(header::CONTENT_LENGTH).unwrap(), "4");
        assert_eq!(body_bytes(second).await, Bytes::from("tiny"));
    }

    #[tokio::test]
    async fn test_trailers_kept() {
        let mut trailers = HeaderMap::new();
        trailers.insert("x-checksum", "abc".parse().unwrap());

        let pool = Arc::new(BufferPool::new());
        let parts = make_parts([("content-encoding", "gzip")]);
        let response: Response<UngzipBody<Full<Bytes>>> =
            finish_response(parts, &gzip(b"data"), Some(trailers), &Policy::default(), &pool);

        let collected = response.into_body().collect().await.unwrap();
        assert_eq!(collected.trailers().unwrap().get("x-checksum").unwrap(), "abc");
        assert_eq!(collected.to_bytes(), Bytes::from("data"));
    }
}
