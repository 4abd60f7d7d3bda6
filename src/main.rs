// region:    --- Imports
use anyhow::{anyhow, Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use quicksell_engine::config;
use quicksell_engine::database::DatabaseManager;
use quicksell_engine::handlers::{self, AppState};
use quicksell_engine::ledger::AuctionLedger;
use quicksell_engine::message_broker::KafkaManager;
use quicksell_engine::outbox::OutboxRelay;
use quicksell_engine::scheduler::AuctionScheduler;
use quicksell_engine::wallet::PostgresBalanceSource;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<()> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 로드
    let cfg = config::load_config()?;

    // DatabaseManager 생성
    let db_manager = Arc::new(
        DatabaseManager::new(&cfg.database)
            .await
            .context("데이터베이스 연결 실패")?,
    );

    // 데이터베이스 초기화
    if let Err(e) = db_manager
        .initialize_database(cfg.database.recreate_on_start)
        .await
    {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // Kafka 매니저 생성 및 초기화
    let kafka_manager = Arc::new(KafkaManager::new(&cfg.kafka));
    if let Err(e) = kafka_manager.initialize().await {
        error!("{:<12} --> Kafka 초기화 실패: {:?}", "Main", e);
        return Err(anyhow!(e));
    }
    info!("{:<12} --> Kafka 초기화 성공", "Main");

    // 알림 토픽 생성
    kafka_manager
        .create_topic(
            &cfg.kafka.topic,
            cfg.kafka.partitions,
            cfg.kafka.replication_factor,
        )
        .await
        .map_err(|e| anyhow!(e))?;

    // 아웃박스 릴레이 시작(커밋된 알림 이벤트를 브로커로 발행)
    let relay = OutboxRelay::new(
        db_manager.get_pool(),
        kafka_manager.get_producer(),
        cfg.kafka.topic.clone(),
        Duration::from_millis(cfg.outbox.poll_ms),
        cfg.outbox.batch_size,
    );
    relay.start().await;

    // 경매 상태 전이 스케줄러 시작
    let scheduler = AuctionScheduler::new(
        db_manager.get_pool(),
        Duration::from_secs(cfg.scheduler.tick_seconds),
    );
    scheduler.start().await;

    // 핸들러 공유 상태
    let state = AppState {
        db: Arc::clone(&db_manager),
        ledger: AuctionLedger::new(db_manager.get_pool()),
        balances: Arc::new(PostgresBalanceSource::new(db_manager.get_pool())),
    };

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/bid", post(handlers::handle_bid))
        .route("/buy-now", post(handlers::handle_buy_now))
        .route("/auctions", get(handlers::handle_get_auctions))
        .route("/auctions/:id", get(handlers::handle_get_auction))
        .route("/auctions/:id/state", get(handlers::handle_get_auction_state))
        .route(
            "/auctions/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route("/auctions/:id/bids", get(handlers::handle_get_bid_history))
        .route(
            "/auctions/:id/cancel",
            post(handlers::handle_cancel_auction),
        )
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20))
        .with_state(state);

    // 리스너 생성
    let listener = TcpListener::bind(format!("{}:{}", cfg.api.host, cfg.api.port))
        .await
        .context("리스너 바인딩 실패")?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
