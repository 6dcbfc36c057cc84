use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::relay::events::OnlineUser;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct OnlineUsersResponse {
    pub users: Vec<OnlineUser>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/online-users", get(online_users))
}

/// Non-realtime snapshot of the connection registry.
async fn online_users(State(state): State<AppState>) -> Json<OnlineUsersResponse> {
    Json(OnlineUsersResponse {
        users: state.relay.online_users(),
    })
}
