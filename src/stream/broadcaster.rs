//! Per-connection random-number broadcaster.
//!
//! A connection authenticates once with `?token=`, then each tick persists a
//! sample, checks the log for its latest row, and pushes a freshly drawn
//! value. The pushed value is not the one just persisted. Ticks are separated
//! by a fixed sleep with no drift compensation.

use crate::{
    auth::{AuthError, AuthState},
    state::AppState,
    stream::sample_log::{Sample, SampleLog},
};
use anyhow::Result;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use std::{borrow::Cow, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub token: Option<String>,
}

/// Why a stream loop stopped
#[derive(Debug, PartialEq)]
pub enum StreamEnd {
    ClientGone,
    NoSample,
    Fault(String),
}

pub struct Broadcaster {
    log: SampleLog,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(log: SampleLog, interval: Duration) -> Self {
        Self { log, interval }
    }

    pub fn log(&self) -> &SampleLog {
        &self.log
    }

    /// Storage faults are logged and swallowed; the stream keeps going.
    pub fn generate_and_persist(&self) -> Option<Sample> {
        let sample = Sample::draw();
        match self.log.append(&sample) {
            Ok(()) => Some(sample),
            Err(e) => {
                warn!("Error generating random number: {:#}", e);
                None
            }
        }
    }

    /// One tick: the frame to push, `None` if the log is empty.
    pub fn tick(&self) -> Result<Option<Sample>> {
        self.generate_and_persist();
        Ok(self.log.latest()?.map(|_| Sample::draw()))
    }

    /// Drive `socket` until the client leaves or a tick cannot produce a frame
    pub async fn serve(&self, socket: &mut WebSocket) -> StreamEnd {
        loop {
            let frame = match self.tick() {
                Ok(Some(frame)) => frame,
                Ok(None) => return StreamEnd::NoSample,
                Err(e) => return StreamEnd::Fault(format!("{:#}", e)),
            };

            let msg = match serde_json::to_string(&frame) {
                Ok(msg) => msg,
                Err(e) => return StreamEnd::Fault(e.to_string()),
            };
            if socket.send(Message::Text(msg)).await.is_err() {
                return StreamEnd::ClientGone;
            }

            let sleep = tokio::time::sleep(self.interval);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    incoming = socket.recv() => match incoming {
                        Some(Ok(Message::Close(_))) | None => return StreamEnd::ClientGone,
                        Some(Err(e)) => {
                            debug!("Stream receive error: {}", e);
                            return StreamEnd::ClientGone;
                        }
                        // Client messages are ignored.
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }
}

/// WebSocket handler - GET /ws/random-numbers?token=...
pub async fn random_numbers_ws(
    ws: WebSocketUpgrade,
    Query(params): Query<StreamParams>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.auth, state.broadcaster, params.token))
}

async fn handle_socket(
    mut socket: WebSocket,
    auth: AuthState,
    broadcaster: Arc<Broadcaster>,
    token: Option<String>,
) {
    let user = match token
        .ok_or(AuthError::MissingToken)
        .and_then(|t| auth.verify(&t))
    {
        Ok(user) => user,
        Err(e) => {
            warn!("Stream rejected: {}", e);
            close(socket, close_code::POLICY, "Unauthorized").await;
            return;
        }
    };

    info!(user = %user, "📡 Random-number stream opened");

    match broadcaster.serve(&mut socket).await {
        StreamEnd::ClientGone => {
            info!(user = %user, "Random-number stream closed by client");
        }
        StreamEnd::NoSample => {
            warn!(user = %user, "Cannot generate timestamp, closing stream");
            close(socket, close_code::NORMAL, "No sample available").await;
        }
        StreamEnd::Fault(reason) => {
            warn!(user = %user, "WebSocket error: {}", reason);
            close(socket, close_code::ERROR, "Internal error").await;
        }
    }
}

async fn close(mut socket: WebSocket, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: Cow::Borrowed(reason),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        debug!("Close frame not delivered: {}", e);
    }
}
