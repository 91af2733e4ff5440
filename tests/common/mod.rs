//! In-process stand-in for the school's activities API.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use signup_board::models::Activity;

pub type Activities = Arc<Mutex<IndexMap<String, Activity>>>;

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

pub fn seed() -> IndexMap<String, Activity> {
    let mut map = IndexMap::new();
    map.insert(
        "Chess Club".to_string(),
        Activity {
            description: "Learn strategies and compete in chess tournaments".to_string(),
            schedule: "Fridays, 3:30 PM - 5:00 PM".to_string(),
            max_participants: 12,
            participants: vec![
                "michael@mergington.edu".to_string(),
                "daniel@mergington.edu".to_string(),
            ],
        },
    );
    map.insert(
        "Art <Studio> & Co".to_string(),
        Activity {
            description: "Paint \"anything\" you like".to_string(),
            schedule: "Wednesdays".to_string(),
            max_participants: 1,
            participants: vec![],
        },
    );
    map
}

pub struct Upstream {
    pub addr: SocketAddr,
    pub activities: Activities,
}

impl Upstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_upstream() -> Upstream {
    let activities: Activities = Arc::new(Mutex::new(seed()));

    let app = Router::new()
        .route("/activities", get(list))
        .route("/activities/:name/signup", post(signup).delete(unregister))
        .route("/broken/activities", get(|| async { "<html>oops</html>" }))
        .route(
            "/down/activities",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
        .route(
            "/bare/activities/:name/signup",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .with_state(activities.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Upstream { addr, activities }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn list(State(activities): State<Activities>) -> Json<IndexMap<String, Activity>> {
    Json(activities.lock().unwrap().clone())
}

async fn signup(
    State(activities): State<Activities>,
    Path(name): Path<String>,
    Query(q): Query<EmailQuery>,
) -> Response {
    let mut activities = activities.lock().unwrap();
    let Some(activity) = activities.get_mut(&name) else {
        return not_found();
    };
    if activity.participants.contains(&q.email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Student is already signed up" })),
        )
            .into_response();
    }
    activity.participants.push(q.email.clone());
    Json(json!({ "message": format!("Signed up {} for {}", q.email, name) })).into_response()
}

async fn unregister(
    State(activities): State<Activities>,
    Path(name): Path<String>,
    Query(q): Query<EmailQuery>,
) -> Response {
    let mut activities = activities.lock().unwrap();
    let Some(activity) = activities.get_mut(&name) else {
        return not_found();
    };
    let Some(pos) = activity.participants.iter().position(|p| *p == q.email) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Student is not signed up for this activity" })),
        )
            .into_response();
    };
    activity.participants.remove(pos);
    Json(json!({ "message": format!("Unregistered {} from {}", q.email, name) })).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Activity not found" })),
    )
        .into_response()
}
