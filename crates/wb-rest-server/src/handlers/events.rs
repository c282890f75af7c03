//! Event log endpoints

use crate::ServerResult;
use crate::error::ServerError;
use crate::models::DataStore;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use wb_api_contract::*;

/// List events newest-first with optional filtering
pub async fn list_events(
    State(state): State<AppState>,
    filters: Result<Query<EventFilterQuery>, QueryRejection>,
) -> ServerResult<Json<Envelope<EventListData>>> {
    let Query(filters) =
        filters.map_err(|_| ServerError::BadRequest("Invalid query parameters".to_string()))?;
    let events = state.store.list_events(&filters).await?;
    let count = events.len();
    Ok(Json(Envelope::ok(EventListData { events, count })))
}
