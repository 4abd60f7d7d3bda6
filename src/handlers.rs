// region:    --- Imports
use crate::bidding::commands::{self, BuyNowCommand, PlaceBidCommand};
use crate::database::DatabaseManager;
use crate::error::{BidRejection, EngineError};
use crate::ledger::AuctionLedger;
use crate::query;
use crate::wallet::BalanceSource;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- App State

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub ledger: AuctionLedger,
    pub balances: Arc<dyn BalanceSource>,
}

// endregion: --- App State

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> impl IntoResponse {
    match commands::handle_place_bid(cmd, &state.db, &state.ledger, state.balances.as_ref()).await {
        Ok(accepted) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "입찰이 성공적으로 처리되었습니다.",
                "auction_id": accepted.auction_id,
                "bid_amount": accepted.bid_amount,
                "current_price": accepted.current_price,
                "status": accepted.status,
                "winner_id": accepted.winner_id,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 즉시 구매 요청 처리
pub async fn handle_buy_now(
    State(state): State<AppState>,
    Json(cmd): Json<BuyNowCommand>,
) -> impl IntoResponse {
    match commands::handle_buy_now(cmd, &state.db, &state.ledger, state.balances.as_ref()).await {
        Ok(accepted) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "즉시 구매가 성공적으로 처리되었습니다.",
                "auction_id": accepted.auction_id,
                "bid_amount": accepted.bid_amount,
                "current_price": accepted.current_price,
                "status": accepted.status,
                "winner_id": accepted.winner_id,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 경매 취소 요청 처리
pub async fn handle_cancel_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    match commands::handle_cancel_auction(auction_id, &state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "경매가 취소되었습니다.",
                "auction_id": auction_id,
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// sqlx 오류를 응답으로 변환(행 없음은 404)
fn query_error(e: sqlx::Error) -> axum::response::Response {
    match e {
        sqlx::Error::RowNotFound => BidRejection::AuctionNotFound.into_response(),
        e => EngineError::from(e).into_response(),
    }
}

/// 경매 상태 조회
pub async fn handle_get_auction_state(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 상태 조회 id: {}", "HandlerQuery", auction_id);
    match state.ledger.current_state(auction_id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => query_error(e),
    }
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!(
        "{:<12} --> 최고 입찰가 조회 id: {}",
        "HandlerQuery", auction_id
    );
    match query::handlers::get_highest_bid(&state.db, auction_id).await {
        Ok(bid) => Json(bid).into_response(),
        Err(e) => query_error(e),
    }
}

/// 입찰 이력 조회 파라미터(키셋 페이지네이션)
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub after: Option<i64>,
    pub limit: Option<i64>,
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", auction_id);
    let after = params.after.unwrap_or(0);
    let limit = params.limit.unwrap_or(100).clamp(1, 500);
    match state.ledger.history_page(auction_id, after, limit).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => query_error(e),
    }
}

/// 모든 경매 조회
pub async fn handle_get_auctions(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 모든 경매 조회", "HandlerQuery");
    match query::handlers::get_all_auctions(&state.db).await {
        Ok(auctions) => Json(auctions).into_response(),
        Err(e) => query_error(e),
    }
}

/// 경매 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> impl IntoResponse {
    info!("{:<12} --> 경매 조회 id: {}", "HandlerQuery", auction_id);
    match query::handlers::get_auction(&state.db, auction_id).await {
        Ok(auction) => Json(auction).into_response(),
        Err(e) => query_error(e),
    }
}

// endregion: --- Query Handlers
