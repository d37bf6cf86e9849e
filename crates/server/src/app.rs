use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use emolens_core::analysis::pipeline_factory::PipelineFactory;
use emolens_core::streaming::protocol::InboundEvent;
use emolens_core::streaming::streaming_responder::StreamingResponder;

#[derive(Clone)]
pub struct AppState {
    factory: Arc<dyn PipelineFactory>,
    next_connection: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(factory: Arc<dyn PipelineFactory>) -> Self {
        Self {
            factory,
            next_connection: Arc::new(AtomicU64::new(1)),
        }
    }

    fn responder(&self) -> StreamingResponder {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        StreamingResponder::new(id, self.factory.clone())
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.responder()))
}

/// Serves one connection. Messages are handled strictly in arrival order;
/// analysis runs on the blocking pool so other connections keep going.
async fn handle_socket(mut socket: WebSocket, responder: StreamingResponder) {
    let id = responder.connection_id();
    log::info!("Client connected: {id}");

    let mut responder = Some(responder);
    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                log::warn!("Connection {id}: receive failed: {e}");
                break;
            }
        };
        if matches!(msg, Message::Close(_)) {
            break;
        }
        let Some(event) = inbound_event(id, msg) else {
            continue;
        };
        let Some(current) = responder.take() else {
            break;
        };
        let (current, reply) = match respond(current, event).await {
            Ok(done) => done,
            Err(e) => {
                log::error!("Connection {id}: analysis task failed: {e}");
                break;
            }
        };
        responder = Some(current);

        if let Some(reply) = reply {
            if socket.send(reply).await.is_err() {
                log::debug!("Connection {id}: send failed");
                break;
            }
        }
    }

    log::info!("Client disconnected: {id}");
}

/// Maps a socket message to a protocol event; `None` means nothing to answer.
fn inbound_event(id: u64, msg: Message) -> Option<InboundEvent> {
    match msg {
        Message::Text(text) => match InboundEvent::from_text(text.as_str()) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("Connection {id}: dropping message: {e}");
                None
            }
        },
        Message::Binary(bytes) => Some(InboundEvent::from_binary(bytes.to_vec())),
        _ => None,
    }
}

/// Runs one event through the responder on the blocking pool and hands the
/// responder back with the encoded reply.
async fn respond(
    mut responder: StreamingResponder,
    event: InboundEvent,
) -> Result<(StreamingResponder, Option<Message>), tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let reply = responder.handle(event).and_then(|out| match out.to_json() {
            Ok(json) => Some(Message::Text(json.into())),
            Err(e) => {
                log::error!("Connection {}: failed to encode reply: {e}", responder.connection_id());
                None
            }
        });
        (responder, reply)
    })
    .await
}
