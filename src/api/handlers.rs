use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::{CurrentUser, RequestId},
    models::{Digit, Position},
    services::{
        sudoku::{Placement, SudokuView},
        wordle::{Key, Submission, WordleView},
        Action, IdentityResolver, SessionSnapshot, TimerScope,
    },
};

use super::AppState;

// Request types

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    /// Browser-side id used to resume the timer of an anonymous player
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectCellRequest {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Deserialize)]
pub struct PlaceDigitRequest {
    pub digit: u8,
}

#[derive(Debug, Deserialize)]
pub struct KeyPressRequest {
    /// A letter, `ENTER` or `BACKSPACE`
    pub key: String,
}

/// Timer persistence scope: the signed-in player, else the client's own id
fn timer_scope(user: &CurrentUser, request: Option<Json<OpenSessionRequest>>) -> Option<TimerScope> {
    if let Some(identity) = user.current_identity() {
        return Some(TimerScope::Player(identity));
    }
    request
        .and_then(|Json(r)| r.client_id)
        .filter(|id| !id.is_empty())
        .map(TimerScope::Client)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Start a session on today's Sudoku
pub async fn open_sudoku(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: CurrentUser,
    request: Option<Json<OpenSessionRequest>>,
) -> AppResult<(StatusCode, Json<SessionSnapshot<SudokuView>>)> {
    tracing::info!(request_id = %request_id, "Opening sudoku session");
    let snapshot = state.sudoku.open(timer_scope(&user, request)).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_sudoku(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot<SudokuView>>> {
    Ok(Json(state.sudoku.snapshot(id).await?))
}

pub async fn select_cell(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<SelectCellRequest>,
) -> AppResult<Json<Action<bool, SudokuView>>> {
    let pos = Position::new(request.row, request.col)?;
    let action = state
        .sudoku
        .act(id, &user, |game| game.select_cell(pos))
        .await?;
    Ok(Json(action))
}

pub async fn place_digit(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<PlaceDigitRequest>,
) -> AppResult<Json<Action<Placement, SudokuView>>> {
    let digit = Digit::try_from(request.digit)?;
    let action = state
        .sudoku
        .act(id, &user, |game| game.place_digit(digit))
        .await?;

    tracing::debug!(
        request_id = %request_id,
        session_id = %id,
        digit = %digit,
        outcome = ?action.outcome,
        "Digit placed"
    );

    Ok(Json(action))
}

/// Fill the board with the solution. Development builds only; never scored.
#[cfg(feature = "dev-reveal")]
pub async fn reveal_solution(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Action<bool, SudokuView>>> {
    tracing::warn!(session_id = %id, "Revealing sudoku solution");
    let action = state
        .sudoku
        .act_unscored(id, |game| game.reveal_solution())
        .await?;
    Ok(Json(action))
}

pub async fn close_sudoku(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sudoku.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start a session on today's Wordle
pub async fn open_wordle(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    user: CurrentUser,
    request: Option<Json<OpenSessionRequest>>,
) -> AppResult<(StatusCode, Json<SessionSnapshot<WordleView>>)> {
    tracing::info!(request_id = %request_id, "Opening wordle session");
    let snapshot = state.wordle.open(timer_scope(&user, request)).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

pub async fn get_wordle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionSnapshot<WordleView>>> {
    Ok(Json(state.wordle.snapshot(id).await?))
}

pub async fn press_key(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    Json(request): Json<KeyPressRequest>,
) -> AppResult<Json<Action<Submission, WordleView>>> {
    let key: Key = request.key.parse()?;
    let action = state.wordle.act(id, &user, |game| game.press(key)).await?;

    if key == Key::Enter {
        tracing::debug!(
            request_id = %request_id,
            session_id = %id,
            outcome = ?action.outcome,
            "Guess submitted"
        );
    }

    Ok(Json(action))
}

pub async fn close_wordle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.wordle.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
