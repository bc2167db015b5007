//! Live reload script injection for HTML responses.
//!
//! The middleware in this module sits in front of the static file service.
//! HTML responses lose their `Content-Length` header and have their body
//! wrapped in [`InjectBody`], which looks at every data frame as it streams
//! past and splices [`RELOAD_SCRIPT`] in front of the last `</body>` marker
//! it finds. Everything else passes through untouched.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use bytes::{Bytes, BytesMut};
use http_body::{Frame, SizeHint};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Client-side script added to every HTML page while live reload is enabled.
///
/// Connects back to the reload endpoint on the same host, reloads when the
/// server says `reload`, and reloads after a one second delay when the
/// connection drops so the page picks itself up once the server is back.
pub const RELOAD_SCRIPT: &str = r"
<script>
(function() {
	const ws = new WebSocket('ws://' + window.location.host + '/ws');
	ws.onmessage = function(event) {
		if (event.data === 'reload') {
			console.log('Files changed, reloading...');
			window.location.reload();
		}
	};
	ws.onclose = function() {
		console.log('Dev server disconnected, retrying...');
		setTimeout(() => window.location.reload(), 1000);
	};
})();
</script>";

/// Closing body marker the script is inserted in front of. Case sensitive.
const BODY_CLOSE: &[u8] = b"</body>";

/// Middleware that injects [`RELOAD_SCRIPT`] into HTML responses.
pub async fn inject_reload_script(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if !is_html(response.headers()) || response.status() == StatusCode::PARTIAL_CONTENT {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    // The body is about to grow, so the declared length would be wrong.
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::new(InjectBody::new(body)))
}

/// Whether the declared content type marks the payload as HTML
#[must_use]
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"))
}

/// Insert [`RELOAD_SCRIPT`] before the last `</body>` in `chunk`.
///
/// Returns `None` when the chunk holds no marker.
#[must_use]
pub fn splice_reload_script(chunk: &[u8]) -> Option<Bytes> {
    let idx = chunk
        .windows(BODY_CLOSE.len())
        .rposition(|window| window == BODY_CLOSE)?;

    let mut out = BytesMut::with_capacity(chunk.len() + RELOAD_SCRIPT.len());
    out.extend_from_slice(&chunk[..idx]);
    out.extend_from_slice(RELOAD_SCRIPT.as_bytes());
    out.extend_from_slice(&chunk[idx..]);
    Some(out.freeze())
}

/// Response body that injects the reload script at most once.
///
/// Detection works one data frame at a time. A marker split across two frames
/// is not seen, and the page is then served without the script.
pub struct InjectBody {
    inner: Body,
    injected: bool,
}

impl InjectBody {
    /// Wrap an HTML response body
    #[must_use]
    pub fn new(inner: Body) -> Self {
        Self {
            inner,
            injected: false,
        }
    }

    fn rewrite(&mut self, data: Bytes) -> Bytes {
        if self.injected {
            return data;
        }
        match splice_reload_script(&data) {
            Some(spliced) => {
                self.injected = true;
                tracing::debug!("Injected live reload script into HTML response");
                spliced
            }
            None => data,
        }
    }
}

impl http_body::Body for InjectBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => Poll::Ready(Some(Ok(Frame::data(this.rewrite(data))))),
                Err(frame) => Poll::Ready(Some(Ok(frame))),
            },
            other => Poll::Ready(other),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        // Never exact: an exact hint would let the server re-derive a length.
        let mut hint = SizeHint::new();
        hint.set_lower(self.inner.size_hint().lower());
        hint
    }
}
