use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::models::StatusMessage;
use crate::services::renderer::{ActivityCard, BoardView};
use crate::services::view_model::ViewModel;

#[derive(Template)]
#[template(path = "activities.html")]
pub struct ActivitiesTemplate {
    pub cards: Vec<ActivityCard>,
    pub loading: bool,
    pub load_error: Option<String>,
    pub notice: Option<StatusMessage>,
}

#[derive(Serialize)]
struct BoardPayload<'a> {
    view: &'a BoardView,
    notice: Option<StatusMessage>,
}

pub async fn activities_handler(State(board): State<ViewModel>) -> Response {
    // First visit before the startup load finished (or it never ran).
    if board.is_uninitialized() {
        board.refresh().await;
    }

    let view = board.view();
    let template = ActivitiesTemplate {
        cards: view
            .tree
            .as_ref()
            .map(|tree| tree.activities.clone())
            .unwrap_or_default(),
        loading: view.is_loading(),
        load_error: view.load_error.clone(),
        notice: board.notifier().current(),
    };

    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!("activities page failed to render: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn board_json_handler(State(board): State<ViewModel>) -> Response {
    let view = board.view();
    Json(BoardPayload {
        view: &view,
        notice: board.notifier().current(),
    })
    .into_response()
}
