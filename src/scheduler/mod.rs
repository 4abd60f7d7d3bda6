/// 경매 상태 전이 스케줄러
/// 시작 시간이 지난 경매를 활성화하고, 종료 시간이 지난 경매를 낙찰/유찰
/// 처리한다. 모든 전이는 status 조건부 업데이트라서 같은 경매를 다시
/// 처리해도 멱등이며, 틱이 겹치거나 재시작되어도 안전하다.
// region:    --- Imports
use crate::auction::events;
use crate::auction::model::{AuctionStatus, BidStatus};
use crate::outbox;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler

/// 경매 상태 전이 스케줄러
pub struct AuctionScheduler {
    pool: Arc<PgPool>,
    tick: Duration,
}

impl AuctionScheduler {
    pub fn new(pool: Arc<PgPool>, tick: Duration) -> Self {
        Self { pool, tick }
    }

    /// 스케줄러 시작
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        let tick = self.tick;
        tokio::spawn(async move {
            let mut interval = interval(tick);
            loop {
                interval.tick().await;
                if let Err(e) = Self::activate_scheduled(&pool).await {
                    error!(
                        "{:<12} --> 경매 활성화 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
                if let Err(e) = Self::close_expired(&pool).await {
                    error!(
                        "{:<12} --> 경매 종결 처리 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        });
    }

    /// SCHEDULED -> ACTIVE 상태 변경
    async fn activate_scheduled(pool: &PgPool) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE auctions SET status = 'ACTIVE', version = version + 1
             WHERE status = 'SCHEDULED' AND start_time <= $1",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 종료 시간이 지난 ACTIVE 경매를 모두 종결 처리
    /// 개별 경매의 실패는 나머지 배치를 막지 않는다(status 조건 덕분에
    /// 다음 틱의 재시도가 안전하다)
    async fn close_expired(pool: &PgPool) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let expired: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM auctions
             WHERE status = 'ACTIVE' AND end_time <= $1
             ORDER BY end_time",
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        for auction_id in expired {
            if let Err(e) = Self::finalize_auction(pool, auction_id).await {
                error!(
                    "{:<12} --> 경매 종결 실패: id={}, {:?}",
                    "Scheduler", auction_id, e
                );
            }
        }
        Ok(())
    }

    /// 단일 경매 종결: 선두 입찰이 있으면 SOLD, 없으면 ENDED
    async fn finalize_auction(pool: &PgPool, auction_id: i64) -> Result<(), sqlx::Error> {
        let now = Utc::now();
        let mut tx = pool.begin().await?;

        // 트랜잭션 안에서 상태/버전 재확인
        let row: Option<(i64, i64, i64)> = sqlx::query_as(
            "SELECT seller_id, current_price, version FROM auctions
             WHERE id = $1 AND status = 'ACTIVE' AND end_time <= $2",
        )
        .bind(auction_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((seller_id, current_price, version)) = row else {
            // 이미 종결된 경매: 멱등 no-op
            debug!(
                "{:<12} --> 이미 종결된 경매 건너뜀: id={}",
                "Scheduler", auction_id
            );
            return Ok(());
        };

        // 현재 선두 입찰
        let leader: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, bidder_id FROM bids
             WHERE auction_id = $1 AND status = $2
             ORDER BY amount DESC, id DESC
             LIMIT 1",
        )
        .bind(auction_id)
        .bind(BidStatus::Active.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let (next_status, winner_id) = match leader {
            Some((_, bidder_id)) => (AuctionStatus::Sold, Some(bidder_id)),
            None => (AuctionStatus::Ended, None),
        };

        let updated = sqlx::query(
            "UPDATE auctions SET status = $1, winner_id = $2, version = version + 1
             WHERE id = $3 AND status = 'ACTIVE' AND version = $4",
        )
        .bind(next_status.as_str())
        .bind(winner_id)
        .bind(auction_id)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // 종결 도중 새 입찰이 커밋됨: 다음 틱에 재시도
            tx.rollback().await?;
            return Ok(());
        }

        if let Some((bid_id, _)) = leader {
            sqlx::query("UPDATE bids SET status = $1 WHERE id = $2")
                .bind(BidStatus::Winning.as_str())
                .bind(bid_id)
                .execute(&mut *tx)
                .await?;
        }

        // 낙찰/패찰/유찰 이벤트 기록
        let bidder_ids: Vec<i64> =
            sqlx::query_scalar("SELECT bidder_id FROM bids WHERE auction_id = $1 ORDER BY id")
                .bind(auction_id)
                .fetch_all(&mut *tx)
                .await?;
        for event in events::closing_events(
            auction_id,
            seller_id,
            current_price,
            winner_id,
            &bidder_ids,
            now,
        ) {
            outbox::enqueue(&mut tx, &event).await?;
        }

        tx.commit().await?;
        info!(
            "{:<12} --> 경매 종결: id={}, status={}",
            "Scheduler",
            auction_id,
            next_status.as_str()
        );
        Ok(())
    }
}

// endregion: --- Auction Scheduler
