pub mod billing;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/billing", billing::router().merge(webhooks::router()))
}
