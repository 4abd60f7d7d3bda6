// region:    --- Imports
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

// endregion: --- Imports

// region:    --- Bid Rejection

/// 입찰 거절 사유(클라이언트가 정정 가능한 오류, 자동 재시도 대상 아님)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidRejection {
    AuctionNotFound,
    NotStarted,
    AlreadyEnded,
    Cancelled,
    InvalidStatus,
    SelfBidForbidden,
    BidTooLow { min_amount: i64 },
    BuyNowUnavailable,
    InsufficientFunds,
    Busy,
}

impl BidRejection {
    pub fn code(&self) -> &'static str {
        match self {
            BidRejection::AuctionNotFound => "AUCTION_NOT_FOUND",
            BidRejection::NotStarted => "NOT_STARTED",
            BidRejection::AlreadyEnded => "ALREADY_ENDED",
            BidRejection::Cancelled => "AUCTION_CANCELLED",
            BidRejection::InvalidStatus => "INVALID_STATUS",
            BidRejection::SelfBidForbidden => "SELF_BID_FORBIDDEN",
            BidRejection::BidTooLow { .. } => "BID_TOO_LOW",
            BidRejection::BuyNowUnavailable => "BUY_NOW_UNAVAILABLE",
            BidRejection::InsufficientFunds => "INSUFFICIENT_FUNDS",
            BidRejection::Busy => "BUSY",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            BidRejection::AuctionNotFound => "경매를 찾을 수 없습니다.",
            BidRejection::NotStarted => "경매가 아직 시작되지 않았습니다.",
            BidRejection::AlreadyEnded => "경매가 이미 종료되었습니다.",
            BidRejection::Cancelled => "취소된 경매입니다.",
            BidRejection::InvalidStatus => "잘못된 경매 상태입니다.",
            BidRejection::SelfBidForbidden => "판매자는 자신의 경매에 입찰할 수 없습니다.",
            BidRejection::BidTooLow { .. } => "입찰 금액이 최소 입찰 가격보다 낮습니다.",
            BidRejection::BuyNowUnavailable => "즉시 구매가 설정되지 않은 경매입니다.",
            BidRejection::InsufficientFunds => "잔액이 부족합니다.",
            BidRejection::Busy => "입찰 경합으로 처리하지 못했습니다. 잠시 후 다시 시도해 주세요.",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            BidRejection::AuctionNotFound => StatusCode::NOT_FOUND,
            BidRejection::Busy => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        let mut body = json!({
            "error": self.message(),
            "code": self.code(),
        });
        // 최소 입찰가는 클라이언트 재시도를 위해 함께 내려준다
        if let BidRejection::BidTooLow { min_amount } = self {
            body["min_amount"] = json!(min_amount);
        }
        body
    }
}

impl IntoResponse for BidRejection {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

// endregion: --- Bid Rejection

// region:    --- Engine Error

/// 엔진 오류: 거절(동기 응답) 또는 영속성 계층 오류(이번 요청에 한해 치명적)
#[derive(Debug)]
pub enum EngineError {
    Rejected(BidRejection),
    Persistence(String),
}

impl From<BidRejection> for EngineError {
    fn from(rejection: BidRejection) -> Self {
        EngineError::Rejected(rejection)
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Persistence(e.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> axum::response::Response {
        match self {
            EngineError::Rejected(rejection) => rejection.into_response(),
            EngineError::Persistence(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "영속성 계층 오류가 발생했습니다.",
                    "code": "PERSISTENCE",
                    "detail": detail,
                })),
            )
                .into_response(),
        }
    }
}

// endregion: --- Engine Error
