use axum::body::{Body, Bytes};
use http_body::{Body as _, Frame, SizeHint};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::summary::Summary;

/// Observes the number of body bytes written once, when the body ends or is
/// dropped, whichever comes first
struct SizeRecorder {
    sizes: Option<Summary>,
    written: u64,
}

impl SizeRecorder {
    fn finish(&mut self) {
        if let Some(sizes) = self.sizes.take() {
            sizes.observe(self.written as f64);
        }
    }
}

impl Drop for SizeRecorder {
    fn drop(&mut self) {
        self.finish();
    }
}

pin_project! {
    /// Response body wrapper recording the bytes actually sent.
    ///
    /// Used for streamed bodies whose length is not known up front.
    pub struct CountingBody {
        #[pin]
        inner: Body,
        recorder: SizeRecorder,
    }
}

impl CountingBody {
    pub fn new(inner: Body, sizes: Summary) -> Self {
        Self {
            inner,
            recorder: SizeRecorder {
                sizes: Some(sizes),
                written: 0,
            },
        }
    }
}

impl http_body::Body for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        match this.inner.poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.recorder.written += data.len() as u64;
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.recorder.finish();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.recorder.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
