//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{PlayerId, Publisher, RoomError, RoomInput};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // Every connection is a fresh anonymous player
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (ws_sink, mut ws_stream) = socket.split();
    let outbound = state.hub.register(player_id);
    let writer_handle = tokio::spawn(run_writer(player_id, ws_sink, outbound));

    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);

    // Reader loop: WebSocket -> registry
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(client_msg) => dispatch(&state, player_id, client_msg).await,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.registry.disconnect(player_id).await;
    state.hub.unregister(player_id);
    writer_handle.abort();

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// Drain the connection's outbound queue into the socket
async fn run_writer(
    player_id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
) {
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = ws_sink.send(Message::Text(frame)).await {
            debug!(player_id = %player_id, error = %e, "WebSocket send failed");
            break;
        }
    }
}

/// Apply one client event
async fn dispatch(state: &AppState, player_id: PlayerId, msg: ClientMsg) {
    match msg {
        ClientMsg::CreateRoom {
            room_name,
            password,
        } => {
            let result = state
                .registry
                .create_room(player_id, &room_name, password)
                .await;
            report_failure(state, player_id, result.map(|_| ()));
        }
        ClientMsg::JoinRoom {
            room_name,
            password,
        } => {
            let result = state
                .registry
                .join_room(player_id, &room_name, password.as_deref())
                .await;
            report_failure(state, player_id, result.map(|_| ()));
        }
        ClientMsg::LeaveRoom { room_id } => {
            if let Err(e) = state.registry.leave_room(player_id, &room_id).await {
                debug!(player_id = %player_id, room_id = %room_id, error = %e, "Leave ignored");
            }
        }
        ClientMsg::StartGame { room_id } => {
            state.registry.start_game(player_id, &room_id).await;
        }
        ClientMsg::PlayerReady { room_id, is_ready } => {
            state
                .registry
                .send_input(player_id, &room_id, RoomInput::Ready { is_ready })
                .await;
        }
        ClientMsg::PlayerJump { room_id } => {
            state
                .registry
                .send_input(player_id, &room_id, RoomInput::Jump)
                .await;
        }
        ClientMsg::PlayerUpdate { room_id, player } => {
            state
                .registry
                .send_input(player_id, &room_id, RoomInput::Update(player))
                .await;
        }
        ClientMsg::SliceFruit {
            room_id,
            fruit_id,
            slice_data,
        } => {
            state
                .registry
                .send_input(
                    player_id,
                    &room_id,
                    RoomInput::Slice {
                        fruit_id,
                        slice_data,
                    },
                )
                .await;
        }
        ClientMsg::UpdateCustomization {
            room_id,
            customization,
        } => {
            state
                .registry
                .send_input(player_id, &room_id, RoomInput::Customize(customization))
                .await;
        }
    }
}

/// Tell the requester why a create or join failed
fn report_failure(state: &AppState, player_id: PlayerId, result: Result<(), RoomError>) {
    if let Err(e) = result {
        warn!(player_id = %player_id, error = %e, "Room request rejected");
        state.hub.send_to(
            player_id,
            &ServerMsg::RoomError {
                message: e.to_string(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::{json, Value};

    fn events(rx: &mut mpsc::Receiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(serde_json::from_str(&frame).unwrap());
        }
        out
    }

    fn client(value: Value) -> ClientMsg {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn create_then_join_over_the_hub() {
        let state = AppState::new(Config::default());
        let (host, guest) = (Uuid::new_v4(), Uuid::new_v4());
        let mut host_rx = state.hub.register(host);
        let mut guest_rx = state.hub.register(guest);

        dispatch(
            &state,
            host,
            client(json!({"event": "createRoom", "data": {"roomName": "lobby"}})),
        )
        .await;
        let host_events = events(&mut host_rx);
        assert_eq!(host_events[0]["event"], "roomCreated");
        assert_eq!(host_events[1]["event"], "gameState");

        dispatch(
            &state,
            guest,
            client(json!({"event": "joinRoom", "data": {"roomName": "lobby"}})),
        )
        .await;
        assert_eq!(events(&mut guest_rx)[0]["event"], "roomJoined");
        let host_events = events(&mut host_rx);
        assert_eq!(host_events[0]["event"], "playerJoined");
        assert_eq!(host_events[0]["data"]["playerCount"], 2);
    }

    #[tokio::test]
    async fn failed_join_reports_room_error_to_requester_only() {
        let state = AppState::new(Config::default());
        let player = Uuid::new_v4();
        let mut rx = state.hub.register(player);

        dispatch(
            &state,
            player,
            client(json!({"event": "joinRoom", "data": {"roomName": "ghost"}})),
        )
        .await;

        let got = events(&mut rx);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0]["event"], "roomError");
        assert_eq!(got[0]["data"]["message"], "Room not found");
    }

    #[tokio::test]
    async fn inputs_route_to_the_players_room() {
        let state = AppState::new(Config::default());
        let player = Uuid::new_v4();
        let mut rx = state.hub.register(player);
        dispatch(
            &state,
            player,
            client(json!({"event": "createRoom", "data": {"roomName": "solo"}})),
        )
        .await;
        let room_id = events(&mut rx)[0]["data"]["roomId"]
            .as_str()
            .unwrap()
            .to_string();

        dispatch(
            &state,
            player,
            client(json!({"event": "playerReady", "data": {"roomId": room_id, "isReady": true}})),
        )
        .await;
        // Leaving round-trips through the room task, so the ready input has landed
        dispatch(
            &state,
            player,
            client(json!({"event": "leaveRoom", "data": {"roomId": room_id}})),
        )
        .await;

        let got = events(&mut rx);
        assert_eq!(got[0]["event"], "playerReadyUpdate");
        assert_eq!(got[0]["data"]["allReady"], true);
        assert_eq!(state.registry.active_rooms(), 0);
    }
}
