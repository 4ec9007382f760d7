//! The presence WebSocket fleet: `/ws/active-users` (spec.md §4.9).
//!
//! One task per socket, server-driven liveness (ping every
//! `ws_ping_interval_secs`, two missed pongs close the connection), plus a
//! broadcast pump per customer topic so `metrics:update` frames reach every
//! authed socket for that customer. Structured the way the teacher's single
//! multiplexed socket in `ws::mux::serve` is: one reader loop, one mpsc-fed
//! writer task, frames dispatched by the tagged `WsIn`/`WsOut` enums.

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use common::Config;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use util::AppState;

use crate::presence::PresenceService;

use super::protocol::{WsIn, WsOut};

pub async fn upgrade(ws: WebSocketUpgrade, State(app): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, app))
}

fn customer_topic(customer_id: &str) -> String {
    format!("customer:{customer_id}")
}

struct AuthedSession {
    customer_id: String,
    session_id: String,
    topic: String,
    pump: tokio::task::JoinHandle<()>,
}

async fn serve(socket: WebSocket, app: AppState) {
    let (mut sink, mut rx) = socket.split();
    let (tx_out, mut rx_out) = mpsc::channel::<Message>(64);

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    let config = Config::get();
    let service = PresenceService::new(app.store_clone(), app.disconnect_clone(), config);

    let mut authed: Option<AuthedSession> = None;
    let mut pong_misses: u32 = 0;
    let mut pinger = interval(Duration::from_secs(config.ws_ping_interval_secs));
    pinger.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            frame = rx.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    Message::Text(text) => {
                        handle_text(&text, &app, &service, &tx_out, &mut authed).await;
                    }
                    Message::Pong(_) => {
                        pong_misses = 0;
                    }
                    Message::Ping(payload) => {
                        let _ = tx_out.send(Message::Pong(payload)).await;
                    }
                    Message::Close(_) => break,
                    Message::Binary(_) => {}
                }
            }
            _ = pinger.tick() => {
                if pong_misses >= config.ws_pong_miss_limit {
                    tracing::info!("closing WS after {pong_misses} missed pongs");
                    break;
                }
                pong_misses += 1;
                if tx_out.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(tx_out);
    let _ = writer.await;

    if let Some(session) = authed {
        session.pump.abort();
        app.ws().unregister(&session.topic, &session.session_id).await;
        if let Ok(Some(record)) = service.store().get(&session.customer_id, &session.session_id).await {
            service.handle_disconnect(&record).await;
        }
    }
}

async fn handle_text(
    text: &Utf8Bytes,
    app: &AppState,
    service: &PresenceService,
    tx_out: &mpsc::Sender<Message>,
    authed: &mut Option<AuthedSession>,
) {
    let parsed: Result<WsIn, _> = serde_json::from_str(text.as_str());
    let reply = match parsed {
        Ok(WsIn::Auth { customer_id, session_id, .. }) => {
            service.disconnect_resolver().cancel(&customer_id, &session_id).await;

            let topic = customer_topic(&customer_id);
            app.ws().register(&topic, &session_id).await;

            let mut brx = app.ws().subscribe(&topic).await;
            let tx_out = tx_out.clone();
            let pump = tokio::spawn(async move {
                while let Ok(text) = brx.recv().await {
                    if tx_out.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            });

            if let Some(prev) = authed.replace(AuthedSession {
                customer_id: customer_id.clone(),
                session_id: session_id.clone(),
                topic,
                pump,
            }) {
                prev.pump.abort();
                app.ws().unregister(&prev.topic, &prev.session_id).await;
            }

            Some(WsOut::Hello { timestamp: chrono::Utc::now().to_rfc3339(), session_id })
        }
        Ok(WsIn::Ping { .. }) => Some(WsOut::Pong { timestamp: chrono::Utc::now().to_rfc3339() }),
        Ok(WsIn::TtlRefresh { session_mode, .. }) => match authed.as_ref() {
            Some(session) => {
                if let Err(e) = service.refresh_ttl(&session.customer_id, &session.session_id, session_mode).await {
                    tracing::warn!(error = %e, "ttl_refresh failed");
                }
                None
            }
            None => Some(WsOut::Error { message: "not authed".into(), code: Some("not_authed") }),
        },
        Err(e) => Some(WsOut::Error { message: format!("invalid frame: {e}"), code: Some("bad_request") }),
    };

    if let Some(reply) = reply {
        if let Ok(json) = serde_json::to_string(&reply) {
            let _ = tx_out.send(Message::Text(json.into())).await;
        }
    }
}
