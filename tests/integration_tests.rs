use axum::http::StatusCode;
use chrono::{Duration, Utc};
use quicksell_engine::auction::model::Auction;
use quicksell_engine::config::DatabaseConfig;
use quicksell_engine::database::DatabaseManager;
use quicksell_engine::query;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// 실행 중인 서비스(로컬 3000 포트)와 PostgreSQL/Kafka 가 필요한 테스트 모음.
/// `cargo test -- --ignored` 로 실행한다.
const BASE_URL: &str = "http://localhost:3000";

/// 트레이싱 초기화
fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("트레이싱 구독자 설정 실패");
}

/// 데이터베이스 매니저 설정
async fn setup() -> Arc<DatabaseManager> {
    let cfg = DatabaseConfig {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        max_connections: 5,
        recreate_on_start: false,
    };
    Arc::new(
        DatabaseManager::new(&cfg)
            .await
            .expect("Failed to create pool"),
    )
}

/// 테스트용 사용자 생성
async fn create_test_user(db_manager: &DatabaseManager, balance: i64) -> i64 {
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO users (username, balance) VALUES ($1, $2) RETURNING id",
                )
                .bind("테스트입찰자")
                .bind(balance)
                .fetch_one(&mut **tx)
                .await
            })
        })
        .await
        .unwrap()
}

/// 테스트용 경매 생성
async fn create_test_auction(
    db_manager: &DatabaseManager,
    title: String,
    description: String,
    seller_id: i64,
) -> Auction {
    db_manager.transaction(|tx| Box::pin(async move {
        sqlx::query_as::<_, Auction>(
            "INSERT INTO auctions (title, description, seller_id, starting_price, current_price, increment_amount, buy_now_price, start_time, end_time, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *"
        )
        .bind(&title)
        .bind(&description)
        .bind(seller_id)
        .bind(10000)
        .bind(10000)
        .bind(1000)
        .bind(500000)
        .bind(Utc::now() - Duration::minutes(1))
        .bind(Utc::now() + Duration::hours(2))
        .bind("ACTIVE")
        .fetch_one(&mut **tx)
        .await
    })).await.unwrap()
}

/// 테스트용 경매 시간/상태 업데이트
async fn update_test_auction(db_manager: &DatabaseManager, auction: Auction) {
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query(
                    "UPDATE auctions SET start_time = $1, end_time = $2, status = $3 WHERE id = $4",
                )
                .bind(auction.start_time)
                .bind(auction.end_time)
                .bind(&auction.status)
                .bind(auction.id)
                .execute(&mut **tx)
                .await
            })
        })
        .await
        .unwrap();
}

/// 입찰 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_place_bid() {
    let db_manager = setup().await;
    let client = Client::new();

    let bidder_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "입찰 테스트 경매".to_string(),
        "입찰 기능 테스트를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    // 최소 입찰가(현재 가격 + 증분)로 입찰
    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": bidder_id,
        "bid_amount": auction.current_price + auction.increment_amount
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(
        updated.current_price,
        auction.current_price + auction.increment_amount
    );
    assert_eq!(updated.total_bids, 1);
}

/// 증분 미달 입찰 거절 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_bid_below_increment_rejected() {
    let db_manager = setup().await;
    let client = Client::new();

    let bidder_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "증분 검증 테스트 경매".to_string(),
        "최소 입찰가 검증을 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    // 증분에 못 미치는 입찰은 최소 입찰가와 함께 거절된다
    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": bidder_id,
        "bid_amount": auction.current_price + auction.increment_amount - 1
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BID_TOO_LOW");
    assert_eq!(
        body["min_amount"],
        auction.current_price + auction.increment_amount
    );

    // 가격은 그대로
    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.current_price, auction.current_price);
}

/// 즉시 구매 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_buy_now() {
    let db_manager = setup().await;
    let client = Client::new();

    let buyer_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "즉시 구매 테스트 경매".to_string(),
        "즉시 구매 기능 테스트를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    let buy_now_data = json!({
        "auction_id": auction.id,
        "buyer_id": buyer_id
    });

    let response = client
        .post(format!("{}/buy-now", BASE_URL))
        .json(&buy_now_data)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.status, "SOLD");
    assert_eq!(updated.winner_id, Some(buyer_id));
    assert_eq!(updated.current_price, auction.buy_now_price.unwrap());
}

/// 즉시 구매 가격 도달 입찰 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_bid_reaching_buy_now_price() {
    let db_manager = setup().await;
    let client = Client::new();

    let bidder_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "즉시 구매 가격 입찰 테스트 경매".to_string(),
        "입찰 금액이 즉시 구매 가격에 도달하는 경우를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    // 즉시 구매 가격 이상의 입찰은 종결 스케줄러를 거치지 않고 바로 낙찰된다
    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": bidder_id,
        "bid_amount": auction.buy_now_price.unwrap()
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(updated.status, "SOLD");
    assert_eq!(updated.winner_id, Some(bidder_id));
    assert_eq!(updated.current_price, auction.buy_now_price.unwrap());
}

/// 셀프 입찰 거절 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_self_bid_rejected() {
    let db_manager = setup().await;
    let client = Client::new();

    let seller_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "셀프 입찰 테스트 경매".to_string(),
        "판매자 본인 입찰 거절 테스트를 위한 경매입니다.".to_string(),
        seller_id,
    )
    .await;

    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": seller_id,
        "bid_amount": auction.current_price + auction.increment_amount
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "SELF_BID_FORBIDDEN");
}

/// 잔액 부족 거절 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_insufficient_funds_rejected() {
    let db_manager = setup().await;
    let client = Client::new();

    // 최소 입찰가에 못 미치는 잔액
    let bidder_id = create_test_user(&db_manager, 5000).await;
    let auction = create_test_auction(
        &db_manager,
        "잔액 부족 테스트 경매".to_string(),
        "잔액 검증 테스트를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": bidder_id,
        "bid_amount": auction.current_price + auction.increment_amount
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
}

/// 경매 사이클 테스트(입찰 후 종료 대기, 낙찰 확인, 멱등성 확인)
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_auction_lifecycle() {
    let db_manager = setup().await;
    let client = Client::new();

    let bidder_id = create_test_user(&db_manager, 1_000_000).await;
    let auction_id = {
        let mut auction = create_test_auction(
            &db_manager,
            "경매 사이클 테스트 경매".to_string(),
            "경매 사이클 테스트(입찰 및 종료 대기, 종료 후 상태 확인)를 위한 경매입니다."
                .to_string(),
            1,
        )
        .await;
        auction.start_time = Utc::now();
        auction.end_time = Utc::now() + Duration::seconds(5);
        let id = auction.id;
        update_test_auction(&db_manager, auction).await;
        id
    };

    let initial = query::handlers::get_auction(&db_manager, auction_id)
        .await
        .unwrap();
    assert_eq!(initial.status, "ACTIVE");

    let bid_data = json!({
        "auction_id": auction_id,
        "bidder_id": bidder_id,
        "bid_amount": initial.current_price + initial.increment_amount
    });

    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    // 경매 종료 및 스케줄러 틱 대기
    tokio::time::sleep(tokio::time::Duration::from_secs(8)).await;

    let closed = query::handlers::get_auction(&db_manager, auction_id)
        .await
        .unwrap();
    assert_eq!(closed.status, "SOLD");
    assert_eq!(closed.winner_id, Some(bidder_id));

    // 스케줄러가 다시 돌아도 종결된 경매는 그대로다(멱등성)
    tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;
    let still_closed = query::handlers::get_auction(&db_manager, auction_id)
        .await
        .unwrap();
    assert_eq!(still_closed.status, "SOLD");
    assert_eq!(still_closed.winner_id, Some(bidder_id));
    assert_eq!(still_closed.version, closed.version);
}

/// 입찰 없는 경매 유찰 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_auction_without_bids_ends() {
    let db_manager = setup().await;

    let auction_id = {
        let mut auction = create_test_auction(
            &db_manager,
            "유찰 테스트 경매".to_string(),
            "입찰 없이 종료되는 경매 테스트입니다.".to_string(),
            1,
        )
        .await;
        auction.start_time = Utc::now() - Duration::minutes(10);
        auction.end_time = Utc::now() + Duration::seconds(3);
        let id = auction.id;
        update_test_auction(&db_manager, auction).await;
        id
    };

    tokio::time::sleep(tokio::time::Duration::from_secs(6)).await;

    let ended = query::handlers::get_auction(&db_manager, auction_id)
        .await
        .unwrap();
    assert_eq!(ended.status, "ENDED");
    assert_eq!(ended.winner_id, None);
}

/// 경매 취소 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_cancel_auction() {
    let db_manager = setup().await;
    let client = Client::new();

    let bidder_id = create_test_user(&db_manager, 1_000_000).await;
    let auction = create_test_auction(
        &db_manager,
        "취소 테스트 경매".to_string(),
        "경매 취소 테스트를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    let response = client
        .post(format!("{}/auctions/{}/cancel", BASE_URL, auction.id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let cancelled = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    // 취소된 경매에는 입찰할 수 없다
    let bid_data = json!({
        "auction_id": auction.id,
        "bidder_id": bidder_id,
        "bid_amount": auction.current_price + auction.increment_amount
    });
    let response = client
        .post(format!("{}/bid", BASE_URL))
        .json(&bid_data)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "AUCTION_CANCELLED");
}

/// 동시성 입찰 테스트
#[tokio::test]
#[ignore = "실행 중인 서비스와 PostgreSQL/Kafka 가 필요합니다"]
async fn test_concurrent_bidding() {
    // 테스트 시작 시 tracing 초기화
    init_tracing();

    let db_manager = setup().await;

    let auction = create_test_auction(
        &db_manager,
        "동시성 입찰 테스트 경매".to_string(),
        "동시성 입찰 기능 테스트를 위한 경매입니다.".to_string(),
        1,
    )
    .await;

    let mut bidder_ids = Vec::new();
    for _ in 0..50 {
        bidder_ids.push(create_test_user(&db_manager, 10_000_000).await);
    }

    // 50개의 동시 입찰 생성
    let mut handles = vec![];
    for (i, bidder_id) in bidder_ids.iter().enumerate() {
        let client = reqwest::Client::new();
        let bid_amount = auction.current_price + (i as i64 + 1) * auction.increment_amount;
        let auction_id = auction.id;
        let bidder_id = *bidder_id;

        let handle = tokio::spawn(async move {
            let bid_data = serde_json::json!({
                "auction_id": auction_id,
                "bidder_id": bidder_id,
                "bid_amount": bid_amount
            });

            let response = client
                .post(format!("{}/bid", BASE_URL))
                .header("Content-Type", "application/json")
                .json(&bid_data)
                .send()
                .await
                .unwrap();

            let status = response.status();
            let body = response.text().await.unwrap();

            (status, body)
        });

        handles.push(handle);
    }

    // 모든 입찰 처리 대기 및 결과 확인
    let mut successful_bids: i64 = 0;
    let mut failed_bids: i64 = 0;
    for handle in handles {
        let (status, body) = handle.await.unwrap();

        if status == StatusCode::OK {
            successful_bids += 1;
        } else if status == StatusCode::BAD_REQUEST || status == StatusCode::CONFLICT {
            let error_info: Value = serde_json::from_str(&body).unwrap();
            if error_info["code"] == "BUSY" {
                error!("입찰 경합으로 인한 BUSY 응답: {:?}", error_info);
            }
            failed_bids += 1;
        }
    }

    info!(
        "성공한 입찰 수: {}, 실패한 입찰 수: {}",
        successful_bids, failed_bids
    );
    assert!(successful_bids >= 1);
    assert_eq!(successful_bids + failed_bids, 50);

    // 최종 상태 확인: 가격은 증분 규칙대로 올랐고 선두는 정확히 하나
    let updated = query::handlers::get_auction(&db_manager, auction.id)
        .await
        .unwrap();
    assert!(updated.current_price >= auction.current_price + auction.increment_amount);
    assert_eq!(updated.total_bids, successful_bids);

    let leaders: Vec<i64> = db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_scalar::<_, i64>(
                    "SELECT bidder_id FROM bids WHERE auction_id = $1 AND status = 'ACTIVE'",
                )
                .bind(auction.id)
                .fetch_all(&mut **tx)
                .await
            })
        })
        .await
        .unwrap();
    assert_eq!(leaders.len(), 1);

    // 수락된 입찰의 최종 가격은 마지막으로 커밋된 입찰 금액과 같다
    let highest = query::handlers::get_highest_bid(&db_manager, auction.id)
        .await
        .unwrap();
    assert_eq!(highest, Some(updated.current_price));
}
