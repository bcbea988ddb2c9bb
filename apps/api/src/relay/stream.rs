use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Provider, RelayError, RelayEvent, TextStream};

enum State {
    /// Provider chosen; request in flight, no bytes read yet.
    Dispatching(BoxFuture<'static, Result<TextStream, RelayError>>),
    /// Vendor connection open; fragments forwarded as they arrive.
    Streaming(TextStream),
    /// `Done` or `Error` has been emitted. Nothing follows.
    Terminated,
}

/// Lazy event sequence for one relay invocation.
///
/// `Dispatching → Streaming → Terminated`, where the transition into
/// `Terminated` always emits exactly one terminal event (`Done` or `Error`).
/// Dropping the stream drops the vendor response, which closes the connection.
pub struct RelayStream {
    id: Uuid,
    provider: Provider,
    fragments: usize,
    state: State,
}

impl RelayStream {
    pub(super) fn new(
        provider: Provider,
        opening: BoxFuture<'static, Result<TextStream, RelayError>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            fragments: 0,
            state: State::Dispatching(opening),
        }
    }

    /// SSE frames ready to hand to an HTTP response body.
    pub fn into_sse(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        self.map(|event| Ok(event.to_sse()))
    }

    fn finish(&mut self, event: RelayEvent) -> Poll<Option<RelayEvent>> {
        self.state = State::Terminated;
        match &event {
            RelayEvent::Error(err) => warn!(
                relay_id = %self.id,
                provider = %self.provider,
                fragments = self.fragments,
                "Relay invocation failed: {err}"
            ),
            _ => debug!(
                relay_id = %self.id,
                provider = %self.provider,
                fragments = self.fragments,
                "Relay invocation completed"
            ),
        }
        Poll::Ready(Some(event))
    }
}

impl Stream for RelayStream {
    type Item = RelayEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RelayEvent>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                State::Dispatching(opening) => match opening.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Ok(upstream)) => {
                        debug!(relay_id = %this.id, provider = %this.provider, "Vendor stream open");
                        this.state = State::Streaming(upstream);
                    }
                    Poll::Ready(Err(err)) => return this.finish(RelayEvent::Error(err)),
                },
                State::Streaming(upstream) => match upstream.poll_next_unpin(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Some(Ok(text))) => {
                        this.fragments += 1;
                        return Poll::Ready(Some(RelayEvent::Text(text)));
                    }
                    Poll::Ready(Some(Err(err))) => return this.finish(RelayEvent::Error(err)),
                    Poll::Ready(None) => return this.finish(RelayEvent::Done),
                },
                State::Terminated => return Poll::Ready(None),
            }
        }
    }
}
