/// 경매 원장
/// 경매별 입찰 이력의 유일한 기록 경로. 모든 변경은 경매 행의 버전을 조건으로
/// 하는 단일 트랜잭션으로 커밋되며, 현재 가격/선두/입찰 수는 원장에서 파생된다.
/// 알림 이벤트는 같은 트랜잭션의 아웃박스에 기록되어 커밋 이후에만 발행된다.
// region:    --- Imports
use crate::auction::events;
use crate::auction::model::{Auction, AuctionStateView, AuctionStatus, Bid, BidStatus};
use crate::outbox;
use crate::query::queries;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- Ledger Types

/// 원장 추가 결과
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub bid_id: i64,
    pub current_price: i64,
    pub bid_count: i64,
    pub unique_bidders: i64,
    pub status: AuctionStatus,
    pub winner_id: Option<i64>,
}

/// 원장 오류
#[derive(Debug)]
pub enum LedgerError {
    /// 다른 입찰 또는 종결 전이와 경합하여 조건부 업데이트가 실패
    Conflict,
    Db(sqlx::Error),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Db(e)
    }
}

// endregion: --- Ledger Types

// region:    --- Auction Ledger

#[derive(Clone)]
pub struct AuctionLedger {
    pool: Arc<PgPool>,
}

impl AuctionLedger {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// 입찰 추가
    /// 이전 선두 입찰을 OUTBID 로 전환하고 새 입찰을 선두(ACTIVE)로 기록한다.
    /// 호출자가 읽은 버전과 다르면 Conflict 를 돌려주고 아무것도 쓰지 않는다.
    pub async fn append_bid(
        &self,
        auction: &Auction,
        bidder_id: i64,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // 신규 입찰자 여부(unique_bidders 캐시 갱신용)
        let already_bid: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bids WHERE auction_id = $1 AND bidder_id = $2)",
        )
        .bind(auction.id)
        .bind(bidder_id)
        .fetch_one(&mut *tx)
        .await?;

        // 경매 행 조건부 업데이트: 경매별 직렬화 지점
        let updated = sqlx::query_as::<_, (i64, i64)>(
            "UPDATE auctions
             SET current_price = $1, version = version + 1,
                 total_bids = total_bids + 1,
                 unique_bidders = unique_bidders + $2
             WHERE id = $3 AND status = $4 AND version = $5
             RETURNING total_bids, unique_bidders",
        )
        .bind(amount)
        .bind(if already_bid { 0i64 } else { 1i64 })
        .bind(auction.id)
        .bind(AuctionStatus::Active.as_str())
        .bind(auction.version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((total_bids, unique_bidders)) = updated else {
            tx.rollback().await?;
            return Err(LedgerError::Conflict);
        };

        // 이전 선두 입찰을 OUTBID 로 전환
        let prev_leader: Option<i64> = sqlx::query_scalar(
            "UPDATE bids SET status = $1
             WHERE auction_id = $2 AND status = $3
             RETURNING bidder_id",
        )
        .bind(BidStatus::Outbid.as_str())
        .bind(auction.id)
        .bind(BidStatus::Active.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        // 새 입찰 기록
        let bid_id: i64 = sqlx::query_scalar(
            "INSERT INTO bids (auction_id, bidder_id, amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(auction.id)
        .bind(bidder_id)
        .bind(amount)
        .bind(BidStatus::Active.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for event in events::bid_accepted_events(auction.id, bidder_id, prev_leader, amount, now) {
            outbox::enqueue(&mut tx, &event).await?;
        }

        tx.commit().await?;
        info!(
            "{:<12} --> 입찰 기록 완료: auction={}, price={}",
            "Ledger", auction.id, amount
        );

        Ok(LedgerEntry {
            bid_id,
            current_price: amount,
            bid_count: total_bids,
            unique_bidders,
            status: AuctionStatus::Active,
            winner_id: None,
        })
    }

    /// 즉시 구매 실행
    /// 경매를 SOLD 로 전이하고 구매자를 낙찰자로 기록한다(종결 스케줄러를 거치지 않는다)
    pub async fn execute_buy_now(
        &self,
        auction: &Auction,
        buyer_id: i64,
        price: i64,
        now: DateTime<Utc>,
    ) -> Result<LedgerEntry, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let already_bid: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bids WHERE auction_id = $1 AND bidder_id = $2)",
        )
        .bind(auction.id)
        .bind(buyer_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, (i64, i64)>(
            "UPDATE auctions
             SET current_price = $1, status = $2, winner_id = $3, version = version + 1,
                 total_bids = total_bids + 1,
                 unique_bidders = unique_bidders + $4
             WHERE id = $5 AND status = $6 AND version = $7
             RETURNING total_bids, unique_bidders",
        )
        .bind(price)
        .bind(AuctionStatus::Sold.as_str())
        .bind(buyer_id)
        .bind(if already_bid { 0i64 } else { 1i64 })
        .bind(auction.id)
        .bind(AuctionStatus::Active.as_str())
        .bind(auction.version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((total_bids, unique_bidders)) = updated else {
            tx.rollback().await?;
            return Err(LedgerError::Conflict);
        };

        sqlx::query("UPDATE bids SET status = $1 WHERE auction_id = $2 AND status = $3")
            .bind(BidStatus::Outbid.as_str())
            .bind(auction.id)
            .bind(BidStatus::Active.as_str())
            .execute(&mut *tx)
            .await?;

        let bid_id: i64 = sqlx::query_scalar(
            "INSERT INTO bids (auction_id, bidder_id, amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(auction.id)
        .bind(buyer_id)
        .bind(price)
        .bind(BidStatus::Winning.as_str())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        // 구매자 외의 모든 입찰자에게 패찰 통지
        let bidder_ids: Vec<i64> =
            sqlx::query_scalar("SELECT bidder_id FROM bids WHERE auction_id = $1 ORDER BY id")
                .bind(auction.id)
                .fetch_all(&mut *tx)
                .await?;
        for event in events::closing_events(
            auction.id,
            auction.seller_id,
            price,
            Some(buyer_id),
            &bidder_ids,
            now,
        ) {
            outbox::enqueue(&mut tx, &event).await?;
        }

        tx.commit().await?;
        info!(
            "{:<12} --> 즉시 구매 낙찰: auction={}, buyer={}, price={}",
            "Ledger", auction.id, buyer_id, price
        );

        Ok(LedgerEntry {
            bid_id,
            current_price: price,
            bid_count: total_bids,
            unique_bidders,
            status: AuctionStatus::Sold,
            winner_id: Some(buyer_id),
        })
    }

    /// 경매 현재 상태 조회(마지막으로 커밋된 입찰 반영)
    pub async fn current_state(&self, auction_id: i64) -> Result<AuctionStateView, sqlx::Error> {
        let auction = sqlx::query_as::<_, Auction>(queries::GET_AUCTION)
            .bind(auction_id)
            .fetch_one(&*self.pool)
            .await?;

        let leader_id: Option<i64> = sqlx::query_scalar(
            "SELECT bidder_id FROM bids
             WHERE auction_id = $1 AND status IN ('ACTIVE', 'WINNING')
             ORDER BY id DESC
             LIMIT 1",
        )
        .bind(auction_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(AuctionStateView {
            auction_id: auction.id,
            status: auction.status,
            current_price: auction.current_price,
            leader_id,
            bid_count: auction.total_bids,
            unique_bidders: auction.unique_bidders,
            end_time: auction.end_time,
        })
    }

    /// 입찰 이력 조회(기록 순서 오름차순, 키셋 페이지네이션으로 재시작 가능)
    pub async fn history_page(
        &self,
        auction_id: i64,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Bid>, sqlx::Error> {
        sqlx::query_as::<_, Bid>(
            "SELECT id, auction_id, bidder_id, amount, status, created_at
             FROM bids
             WHERE auction_id = $1 AND id > $2
             ORDER BY id ASC
             LIMIT $3",
        )
        .bind(auction_id)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await
    }
}

// endregion: --- Auction Ledger
