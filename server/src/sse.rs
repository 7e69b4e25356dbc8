//! Bridges an analysis run onto a Server-Sent Events response.

use axum::response::sse::{Event, KeepAlive, Sse};
use engine::AnalysisEvent;
use futures_util::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn to_sse(event: &AnalysisEvent) -> Option<Event> {
    match event.data() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
            None
        }
    }
}

/// Streams run events until the run closes its channel.
///
/// Dropping the response (client disconnect) drops the receiver, which the
/// run observes as abandonment.
pub fn event_stream(
    mut events: mpsc::Receiver<AnalysisEvent>
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = events.recv().await {
            tracing::debug!(event = event.name(), "SSE: sending event");
            if let Some(sse) = to_sse(&event) {
                yield Ok(sse);
            }
        }
        tracing::debug!("SSE: run stream closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive")
    )
}
