pub mod health;
pub mod online_users;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(online_users::router())
        .merge(crate::relay::server::router())
}
