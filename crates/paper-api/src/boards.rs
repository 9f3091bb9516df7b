use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::IntoResponse,
};

use paper_grid::bounds::{self, BOARD_HEIGHT, BOARD_WIDTH};
use paper_grid::coords::page_count;
use paper_grid::nearest::DEFAULT_SUGGESTION_LIMIT;
use paper_types::api::{LayoutQuery, LayoutResponse, SuggestionQuery, SuggestionsResponse};
use paper_types::models::MemberId;

use crate::AppState;
use crate::error::ApiError;

const MAX_SUGGESTIONS: usize = 20;

/// GET /boards/{owner_id}/suggestions?x=&y=&limit= — free slots near a target.
pub async fn suggestions(
    State(state): State<AppState>,
    owner_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<SuggestionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(owner_id) = owner_id?;
    let Query(query) = query?;
    let owner = MemberId(owner_id);
    let target = bounds::validate(query.x, query.y)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SUGGESTION_LIMIT)
        .clamp(1, MAX_SUGGESTIONS);

    let svc = state.clone();
    let suggestions =
        tokio::task::spawn_blocking(move || svc.placement.suggest(owner, target, limit)).await??;

    Ok(Json(SuggestionsResponse {
        target,
        suggestions,
    }))
}

/// GET /boards/{owner_id}/layout?profile= — how the board paginates.
/// Every board shares the same geometry, so the owner segment is not read.
pub async fn layout(
    query: Result<Query<LayoutQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let profile = query.profile;
    Ok(Json(LayoutResponse {
        profile,
        columns_per_page: profile.columns_per_page(),
        page_count: page_count(profile),
        width: BOARD_WIDTH,
        height: BOARD_HEIGHT,
    }))
}
