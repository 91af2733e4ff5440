use axum::{extract::State, response::Redirect, Form};
use serde::Deserialize;

use crate::services::view_model::ViewModel;

const BOARD_PATH: &str = "/activities";

#[derive(Debug, Deserialize)]
pub struct SignupCommandForm {
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub email: String,
}

// Outcomes are reported through the notifier, so every command lands back on the board.

pub async fn signup_command_handler(
    State(board): State<ViewModel>,
    Form(form): Form<SignupCommandForm>,
) -> Redirect {
    board.submit_registration(&form.activity, &form.email).await;
    Redirect::to(BOARD_PATH)
}

pub async fn unregister_command_handler(
    State(board): State<ViewModel>,
    Form(form): Form<SignupCommandForm>,
) -> Redirect {
    board.submit_unregistration(&form.activity, &form.email).await;
    Redirect::to(BOARD_PATH)
}

pub async fn refresh_command_handler(State(board): State<ViewModel>) -> Redirect {
    board.refresh().await;
    Redirect::to(BOARD_PATH)
}
