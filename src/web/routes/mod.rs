pub mod activities;
pub mod activity;

use axum::{
    response::Redirect,
    routing::{get, get_service, post},
    Router,
};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::services::view_model::ViewModel;

pub fn router(board: ViewModel) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/activities") }))
        .route("/activities", get(activities::activities_handler))
        .route(
            "/activities/refresh",
            post(activity::refresh_command_handler),
        )
        .route("/activities/signup", post(activity::signup_command_handler))
        .route(
            "/activities/unregister",
            post(activity::unregister_command_handler),
        )
        .route("/api/board", get(activities::board_json_handler))
        // Static files
        .nest_service(
            "/assets",
            get_service(ServeDir::new("assets")).layer(SetResponseHeaderLayer::if_not_present(
                CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            )),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .with_state(board)
}
