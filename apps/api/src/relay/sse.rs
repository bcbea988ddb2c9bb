//! Upstream plumbing shared by every backend: status checks and SSE decoding
//! of the vendor response body.

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Response;

use super::RelayError;

/// Payload every OpenAI-compatible vendor sends as its final `data:` line.
pub(super) const DONE_SENTINEL: &str = "[DONE]";

/// Passes a 2xx response through; anything else becomes `RelayError::Api`
/// carrying the vendor's response body.
pub(super) async fn ensure_success(
    response: Response,
    vendor: &'static str,
) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RelayError::Api {
        vendor,
        status: status.as_u16(),
        body,
    })
}

/// Decodes a `text/event-stream` body into events as bytes arrive.
/// Transport failures mid-body surface as `RelayError::Read`.
pub(super) fn upstream_events(response: Response) -> BoxStream<'static, Result<Event, RelayError>> {
    response
        .bytes_stream()
        .eventsource()
        .map(|item| item.map_err(read_error))
        .boxed()
}

fn read_error(err: EventStreamError<reqwest::Error>) -> RelayError {
    match err {
        EventStreamError::Transport(err) => RelayError::Read(err.without_url().to_string()),
        other => RelayError::Read(other.to_string()),
    }
}

/// Splits an event's payload back into its `data:` lines.
///
/// Consecutive `data:` lines without a blank line between them arrive as one
/// event joined by `\n`; every vendor sends one JSON document per line, so
/// each line is parsed on its own.
pub(super) fn data_lines(event: &Event) -> impl Iterator<Item = &str> {
    event
        .data
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
}
