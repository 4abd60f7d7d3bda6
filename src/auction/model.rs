// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Status

/// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    Scheduled,
    Active,
    Ended,
    Sold,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Scheduled => "SCHEDULED",
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Ended => "ENDED",
            AuctionStatus::Sold => "SOLD",
            AuctionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(AuctionStatus::Scheduled),
            "ACTIVE" => Some(AuctionStatus::Active),
            "ENDED" => Some(AuctionStatus::Ended),
            "SOLD" => Some(AuctionStatus::Sold),
            "CANCELLED" => Some(AuctionStatus::Cancelled),
            _ => None,
        }
    }

    /// 종결 상태 여부(종결 상태에서는 어떤 전이도 허용되지 않는다)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuctionStatus::Ended | AuctionStatus::Sold | AuctionStatus::Cancelled
        )
    }
}

/// 입찰 상태
/// ACTIVE: 현재 선두, OUTBID: 더 높은 입찰로 밀려남, WINNING: 낙찰 확정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidStatus {
    Active,
    Outbid,
    Winning,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Active => "ACTIVE",
            BidStatus::Outbid => "OUTBID",
            BidStatus::Winning => "WINNING",
        }
    }
}

// endregion: --- Status

// region:    --- Models

// 경매 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub seller_id: i64,
    pub starting_price: i64,
    pub current_price: i64,
    pub increment_amount: i64,
    pub buy_now_price: Option<i64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub winner_id: Option<i64>,
    pub total_bids: i64,
    pub unique_bidders: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

// 입찰 모델
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// 경매 현재 상태 projection
/// 원장에서 파생되며, 마지막으로 커밋된 입찰을 반영한다
#[derive(Debug, Serialize)]
pub struct AuctionStateView {
    pub auction_id: i64,
    pub status: String,
    pub current_price: i64,
    pub leader_id: Option<i64>,
    pub bid_count: i64,
    pub unique_bidders: i64,
    pub end_time: DateTime<Utc>,
}

// endregion: --- Models
