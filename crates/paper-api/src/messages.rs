use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};
use uuid::Uuid;

use paper_grid::coords::{page_columns, page_count, to_paged};
use paper_grid::{MessageStore, PlacementResult, RemoveOutcome};
use paper_types::api::{
    BoardMessage, BoardMessagesResponse, BoardQuery, Claims, PlaceMessageRequest,
    PlacementResponse,
};
use paper_types::models::{MemberId, MessageId};

use crate::AppState;
use crate::error::{ApiError, out_of_bounds_body};

/// POST /boards/{owner_id}/messages — pin an anonymous message to a slot.
pub async fn place_message(
    State(state): State<AppState>,
    owner_id: Result<Path<i64>, PathRejection>,
    req: Result<Json<PlaceMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(owner_id) = owner_id?;
    let Json(req) = req?;
    let owner = MemberId(owner_id);

    // Run blocking DB work off the async runtime
    let svc = state.clone();
    let result =
        tokio::task::spawn_blocking(move || svc.placement.place(owner, req.into())).await??;

    let (status, body) = match result {
        PlacementResult::Placed(message) => {
            (StatusCode::CREATED, PlacementResponse::Placed { message })
        }
        PlacementResult::Conflict { suggestions } => {
            debug!("Conflict on board {}, offering {} slots", owner, suggestions.len());
            (StatusCode::CONFLICT, PlacementResponse::Conflict { suggestions })
        }
        PlacementResult::OutOfBounds(oob) => {
            (StatusCode::UNPROCESSABLE_ENTITY, out_of_bounds_body(&oob))
        }
        PlacementResult::ValidationError { field, reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            PlacementResponse::error(Some(field.as_str()), reason),
        ),
    };

    Ok((status, Json(body)))
}

/// GET /boards/{owner_id}/messages — the whole board, or one page of it.
pub async fn list_messages(
    State(state): State<AppState>,
    owner_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<BoardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(owner_id) = owner_id?;
    let Query(query) = query?;
    let owner = MemberId(owner_id);
    let profile = query.profile;

    let columns = match query.page {
        Some(page) => Some(page_columns(page, profile).ok_or_else(|| {
            ApiError::BadRequest(format!("page must be 1-{}", page_count(profile)))
        })?),
        None => None,
    };

    let svc = state.clone();
    let messages = tokio::task::spawn_blocking(move || svc.placement.store().list_messages(owner))
        .await?
        .map_err(paper_grid::Unavailable::from)?;

    let messages = messages
        .into_iter()
        .filter(|m| columns.as_ref().is_none_or(|range| range.contains(&m.x)))
        .map(|message| BoardMessage {
            position: to_paged(message.coordinate(), profile),
            message,
        })
        .collect();

    Ok(Json(BoardMessagesResponse {
        owner_id: owner,
        profile,
        page: query.page,
        messages,
    }))
}

/// DELETE /boards/{owner_id}/messages/{message_id} — owner only.
pub async fn delete_message(
    State(state): State<AppState>,
    ids: Result<Path<(i64, Uuid)>, PathRejection>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((owner_id, message_id)) = ids?;
    let owner = MemberId(owner_id);
    let requester = claims.sub;

    let svc = state.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        svc.placement.remove(owner, requester, MessageId(message_id))
    })
    .await??;

    match outcome {
        RemoveOutcome::Removed(_) => Ok(StatusCode::NO_CONTENT),
        RemoveOutcome::Forbidden => Err(ApiError::Forbidden),
        RemoveOutcome::NotFound => {
            warn!("Delete of unknown message {} on board {}", message_id, owner);
            Err(ApiError::NotFound)
        }
    }
}
