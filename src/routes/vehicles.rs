// Handlers for the public vehicle endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::SearchParams,
    search::{
        self, FacetSummary, ListingFilter, SearchCriteria,
        suggest::{self, DEFAULT_SUGGESTION_LIMIT, MAX_SUGGESTION_LIMIT, Suggestion},
    },
};

#[derive(Serialize)]
struct FiltersResponse {
    total: usize,
    filters: FacetSummary,
}

#[derive(Serialize)]
struct SuggestionsResponse {
    suggestions: Vec<Suggestion>,
}

#[derive(Deserialize)]
pub struct SuggestionQuery {
    q: Option<String>,
    limit: Option<usize>,
}

// GET /api/vehicles/search
// Facets in the response describe the filtered set, not the whole inventory.
pub async fn search_vehicles(
    State(app_state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<SearchParams>, AppError>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: search_vehicles with params: {:?}", params);
    let criteria = SearchCriteria::try_from(&params)?;

    let matched = app_state.listings.find(&criteria.filter()).await?;
    let response = search::execute(matched, &criteria);

    tracing::info!(
        "Search matched {} listings, returning page {} of {}",
        response.meta.total,
        response.meta.page,
        response.meta.total_pages
    );
    Ok(Json(response))
}

// GET /api/vehicles/filters
// Global facets over the full inventory
pub async fn get_filters(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: get_filters");
    // Total and facets come from the same snapshot
    let listings = app_state.listings.find(&ListingFilter::new()).await?;

    Ok(Json(FiltersResponse {
        total: listings.len(),
        filters: search::facets(&listings),
    }))
}

// GET /api/vehicles/suggestions?q=toy&limit=5
pub async fn get_suggestions(
    State(app_state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SuggestionQuery>, AppError>,
) -> AppResult<impl IntoResponse> {
    let q = query.q.unwrap_or_default();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SUGGESTION_LIMIT)
        .clamp(1, MAX_SUGGESTION_LIMIT);
    tracing::debug!("API call: get_suggestions q={:?} limit={}", q, limit);

    let listings = app_state.listings.find(&ListingFilter::new()).await?;
    let source = suggest::suggestion_source(&listings);

    Ok(Json(SuggestionsResponse {
        suggestions: suggest::suggest(&q, &source, limit),
    }))
}

// GET /api/vehicles/:id
pub async fn get_vehicle(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    tracing::info!("API call: get_vehicle {}", id);
    let listing = app_state
        .listings
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle {} not found", id)))?;
    Ok(Json(listing))
}
