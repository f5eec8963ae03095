// SPDX-License-Identifier: GPL-3.0-or-later
use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::{stream, Stream};
use marquee_application::AppState;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Resource changes as Server-Sent Events; the event name is the resource name.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses((status = 200, description = "text/event-stream of resource changes")),
    tag = "system"
)]
pub async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.hub.subscribe();
    debug!(target: "api", subscribers = state.hub.subscriber_count(), "event stream opened");

    let stream = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(message) => {
                    let event = Event::default().event(message.channel).data(message.payload);
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "api", skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
