/// 입찰 관련 커맨드 처리
/// 1. 입찰
/// 2. 즉시 구매
/// 3. 경매 취소
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use crate::bidding::rules::{self, BidOutcome};
use crate::database::DatabaseManager;
use crate::error::{BidRejection, EngineError};
use crate::ledger::{AuctionLedger, LedgerError};
use crate::query::handlers;
use crate::wallet::BalanceSource;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bid_amount: i64,
}

/// 즉시 구매 명령
#[derive(Debug, Serialize, Deserialize)]
pub struct BuyNowCommand {
    pub auction_id: i64,
    pub buyer_id: i64,
}

/// 수락된 입찰 결과
#[derive(Debug, Serialize)]
pub struct BidAccepted {
    pub auction_id: i64,
    pub bid_id: i64,
    pub bid_amount: i64,
    pub current_price: i64,
    pub status: String,
    pub winner_id: Option<i64>,
}

// 낙관적 동시성 충돌 시 최대 재시도 횟수(초과 시 BUSY 로 즉시 실패)
const MAX_RETRIES: i32 = 10;

/// 경매 조회(없으면 거절로 변환)
async fn fetch_auction(db: &DatabaseManager, auction_id: i64) -> Result<Auction, EngineError> {
    match handlers::get_auction(db, auction_id).await {
        Ok(auction) => Ok(auction),
        Err(sqlx::Error::RowNotFound) => Err(BidRejection::AuctionNotFound.into()),
        Err(e) => Err(e.into()),
    }
}

/// 1. 입찰
/// 검증-추가 전체가 경매별 직렬화 지점(버전 조건부 업데이트)에 대해 원자적이며,
/// 충돌 시 최신 상태를 다시 읽어 재검증한다. 뒤늦게 커밋된 입찰이 갱신된 가격에
/// 대해 최소 입찰가 검증을 통과하지 못하면 그대로 거절된다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    db: &DatabaseManager,
    ledger: &AuctionLedger,
    balances: &dyn BalanceSource,
) -> Result<BidAccepted, EngineError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let mut retries = 0;

    while retries < MAX_RETRIES {
        let auction = fetch_auction(db, cmd.auction_id).await?;
        let now = Utc::now();

        // 상태/기간/셀프 입찰/최소 입찰가 검증
        let outcome = rules::validate_bid(&auction, cmd.bidder_id, cmd.bid_amount, now)
            .map_err(EngineError::Rejected)?;

        // 잔액 검증(외부 잔액 조회 협력자)
        let balance = balances.available_balance(cmd.bidder_id).await?;
        rules::check_funds(balance, cmd.bid_amount).map_err(EngineError::Rejected)?;

        let result = match outcome {
            BidOutcome::Lead => {
                ledger
                    .append_bid(&auction, cmd.bidder_id, cmd.bid_amount, now)
                    .await
            }
            // 입찰 금액이 즉시 구매 가격 이상인 경우 즉시 낙찰 처리
            BidOutcome::BuyNow { price } => {
                ledger
                    .execute_buy_now(&auction, cmd.bidder_id, price, now)
                    .await
            }
        };

        match result {
            Ok(entry) => {
                return Ok(BidAccepted {
                    auction_id: cmd.auction_id,
                    bid_id: entry.bid_id,
                    bid_amount: entry.current_price,
                    current_price: entry.current_price,
                    status: entry.status.as_str().to_string(),
                    winner_id: entry.winner_id,
                })
            }
            Err(LedgerError::Conflict) => {
                warn!(
                    "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
                    "Command"
                );
                retries += 1;
                continue;
            }
            Err(LedgerError::Db(e)) => return Err(e.into()),
        }
    }

    Err(BidRejection::Busy.into())
}

/// 2. 즉시 구매(낙찰)
pub async fn handle_buy_now(
    cmd: BuyNowCommand,
    db: &DatabaseManager,
    ledger: &AuctionLedger,
    balances: &dyn BalanceSource,
) -> Result<BidAccepted, EngineError> {
    info!("{:<12} --> 즉시 구매 요청 처리 시작: {:?}", "Command", cmd);
    let mut retries = 0;

    while retries < MAX_RETRIES {
        let auction = fetch_auction(db, cmd.auction_id).await?;
        let now = Utc::now();

        let price =
            rules::validate_buy_now(&auction, cmd.buyer_id, now).map_err(EngineError::Rejected)?;

        let balance = balances.available_balance(cmd.buyer_id).await?;
        rules::check_funds(balance, price).map_err(EngineError::Rejected)?;

        match ledger.execute_buy_now(&auction, cmd.buyer_id, price, now).await {
            Ok(entry) => {
                info!(
                    "{:<12} --> 즉시 구매가 성공적으로 처리되었습니다: auction={}",
                    "Command", cmd.auction_id
                );
                return Ok(BidAccepted {
                    auction_id: cmd.auction_id,
                    bid_id: entry.bid_id,
                    bid_amount: entry.current_price,
                    current_price: entry.current_price,
                    status: entry.status.as_str().to_string(),
                    winner_id: entry.winner_id,
                });
            }
            Err(LedgerError::Conflict) => {
                warn!(
                    "{:<12} --> 낙관적 업데이트로 인한 버전 충돌: 재시도",
                    "Command"
                );
                retries += 1;
                continue;
            }
            Err(LedgerError::Db(e)) => return Err(e.into()),
        }
    }

    Err(BidRejection::Busy.into())
}

/// 3. 경매 취소
/// 종결 상태로의 전이일 뿐 어떤 기록도 삭제하지 않는다
pub async fn handle_cancel_auction(
    auction_id: i64,
    db: &DatabaseManager,
) -> Result<(), EngineError> {
    info!("{:<12} --> 경매 취소 요청: id={}", "Command", auction_id);

    let auction = fetch_auction(db, auction_id).await?;
    match AuctionStatus::parse(&auction.status) {
        Some(AuctionStatus::Cancelled) => return Err(BidRejection::Cancelled.into()),
        Some(status) if status.is_terminal() => return Err(BidRejection::AlreadyEnded.into()),
        Some(_) => {}
        None => return Err(BidRejection::InvalidStatus.into()),
    }

    let result = sqlx::query(
        "UPDATE auctions SET status = $1, version = version + 1
         WHERE id = $2 AND status IN ('SCHEDULED', 'ACTIVE')",
    )
    .bind(AuctionStatus::Cancelled.as_str())
    .bind(auction_id)
    .execute(db.pool())
    .await?;

    if result.rows_affected() == 0 {
        // 조회와 취소 사이에 종결 전이가 커밋됨
        return Err(BidRejection::Busy.into());
    }

    info!("{:<12} --> 경매 취소 완료: id={}", "Command", auction_id);
    Ok(())
}

// endregion: --- Commands
