use bytes::{Buf, Bytes};
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// A response body produced by the ungzip middleware.
    ///
    /// Responses that were never buffered keep streaming the downstream body.
    /// Buffered responses replay (or replace) the captured bytes in a single
    /// data frame, followed by any trailers the downstream body sent.
    #[project = UngzipBodyProj]
    #[allow(missing_docs)]
    pub enum UngzipBody<B> {
        /// Downstream body streamed without buffering.
        Passthrough {
            #[pin]
            inner: B,
        },
        /// Fully buffered body.
        Buffered {
            data: Option<Bytes>,
            trailers: Option<HeaderMap>,
        },
    }
}

impl<B> UngzipBody<B> {
    /// Creates a body that streams the downstream body unchanged.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }

    /// Creates a body from fully buffered bytes and optional trailers.
    pub fn buffered(data: Bytes, trailers: Option<HeaderMap>) -> Self {
        Self::Buffered {
            data: (!data.is_empty()).then_some(data),
            trailers,
        }
    }
}

impl<B> Body for UngzipBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            UngzipBodyProj::Passthrough { inner } => match inner.poll_frame(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Ok(
                    // Zero-copy when the downstream data is already `Bytes`.
                    frame.map_data(|mut data| data.copy_to_bytes(data.remaining())),
                ))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
            },
            UngzipBodyProj::Buffered { data, trailers } => {
                if let Some(data) = data.take() {
                    return Poll::Ready(Some(Ok(Frame::data(data))));
                }
                Poll::Ready(trailers.take().map(|t| Ok(Frame::trailers(t))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            UngzipBody::Passthrough { inner } => inner.is_end_stream(),
            UngzipBody::Buffered { data, trailers } => data.is_none() && trailers.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            UngzipBody::Passthrough { inner } => inner.size_hint(),
            UngzipBody::Buffered { data, .. } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
        }
    }
}

impl<B> fmt::Debug for UngzipBody<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UngzipBody::Passthrough { .. } => f.debug_struct("Passthrough").finish_non_exhaustive(),
            UngzipBody::Buffered { data, trailers } => f
                .debug_struct("Buffered")
                .field("len", &data.as_ref().map_or(0, Bytes::len))
                .field("trailers", trailers)
                .finish(),
        }
    }
}
