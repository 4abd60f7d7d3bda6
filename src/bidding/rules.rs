/// 입찰 검증 규칙
/// 순서: 상태/기간 -> 셀프 입찰 -> 최소 입찰가 -> (잔액) -> 즉시 구매 분기
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use crate::error::BidRejection;
use chrono::{DateTime, Utc};

// endregion: --- Imports

// region:    --- Rules

/// 수락된 입찰의 처리 경로
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidOutcome {
    /// 일반 입찰: 새로운 선두로 기록
    Lead,
    /// 즉시 구매 가격 도달: 경매를 바로 낙찰 처리
    BuyNow { price: i64 },
}

/// 다음 입찰이 수락되기 위한 최소 금액
pub fn min_acceptable(auction: &Auction) -> i64 {
    auction.current_price + auction.increment_amount
}

/// 경매 상태와 입찰 가능 기간 검증(기간은 [start_time, end_time) 반개구간)
pub fn check_window(auction: &Auction, now: DateTime<Utc>) -> Result<(), BidRejection> {
    match AuctionStatus::parse(&auction.status) {
        Some(AuctionStatus::Active) => {}
        Some(AuctionStatus::Scheduled) => return Err(BidRejection::NotStarted),
        Some(AuctionStatus::Ended) | Some(AuctionStatus::Sold) => {
            return Err(BidRejection::AlreadyEnded)
        }
        Some(AuctionStatus::Cancelled) => return Err(BidRejection::Cancelled),
        None => return Err(BidRejection::InvalidStatus),
    }
    if now < auction.start_time {
        return Err(BidRejection::NotStarted);
    }
    if now >= auction.end_time {
        return Err(BidRejection::AlreadyEnded);
    }
    Ok(())
}

/// 입찰 검증(잔액 검증은 외부 협력자 조회가 필요하므로 check_funds 로 분리)
pub fn validate_bid(
    auction: &Auction,
    bidder_id: i64,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<BidOutcome, BidRejection> {
    check_window(auction, now)?;
    if bidder_id == auction.seller_id {
        return Err(BidRejection::SelfBidForbidden);
    }
    let min_amount = min_acceptable(auction);
    if amount < min_amount {
        return Err(BidRejection::BidTooLow { min_amount });
    }
    if let Some(price) = auction.buy_now_price {
        if amount >= price {
            return Ok(BidOutcome::BuyNow { price });
        }
    }
    Ok(BidOutcome::Lead)
}

/// 즉시 구매 검증: 구매 가격을 돌려준다
pub fn validate_buy_now(
    auction: &Auction,
    buyer_id: i64,
    now: DateTime<Utc>,
) -> Result<i64, BidRejection> {
    check_window(auction, now)?;
    if buyer_id == auction.seller_id {
        return Err(BidRejection::SelfBidForbidden);
    }
    auction.buy_now_price.ok_or(BidRejection::BuyNowUnavailable)
}

/// 잔액 검증
pub fn check_funds(balance: i64, amount: i64) -> Result<(), BidRejection> {
    if balance < amount {
        return Err(BidRejection::InsufficientFunds);
    }
    Ok(())
}

// endregion: --- Rules

// region:    --- Tests


// endregion: --- Tests
