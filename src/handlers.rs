use crate::errors::AppError;
use crate::models::{RefreshResponse, ViewModel};
use crate::refresh::RefreshOutcome;
use crate::state::AppState;
use crate::ui::render_dashboard;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let view = current_view(&state).await?;
    Ok(Html(render_dashboard(&view)))
}

pub async fn get_dashboard(State(state): State<AppState>) -> Result<Json<ViewModel>, AppError> {
    let view = current_view(&state).await?;
    Ok(Json(view.as_ref().clone()))
}

pub async fn refresh(State(state): State<AppState>) -> Response {
    match state.refresher.refresh().await {
        RefreshOutcome::Refreshed(view) => Json(view.as_ref().clone()).into_response(),
        RefreshOutcome::AlreadyRunning => (
            StatusCode::ACCEPTED,
            Json(RefreshResponse { status: "in_progress" }),
        )
            .into_response(),
    }
}

pub async fn refresh_form(State(state): State<AppState>) -> Redirect {
    state.refresher.refresh().await;
    Redirect::to("/")
}

async fn current_view(state: &AppState) -> Result<Arc<ViewModel>, AppError> {
    state
        .refresher
        .current()
        .await
        .ok_or_else(|| AppError::unavailable("dashboard is still loading, try again shortly"))
}
