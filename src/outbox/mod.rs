/// 알림 아웃박스
/// 입찰/종결 전이와 같은 트랜잭션으로 이벤트를 기록하고, 릴레이가 커밋된
/// 이벤트만 브로커로 발행한다. 발행과 게시 시각 기록 사이에서 중단되면
/// 다음 폴링에서 다시 발행되므로 전달 보장은 최소 1회다.
// region:    --- Imports
use crate::auction::events::NotificationEvent;
use crate::message_broker::KafkaProducer;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Enqueue

/// 트랜잭션 내 이벤트 기록
pub async fn enqueue(
    tx: &mut Transaction<'_, Postgres>,
    event: &NotificationEvent,
) -> Result<(), sqlx::Error> {
    let data = serde_json::to_string(event).map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
    sqlx::query(
        "INSERT INTO outbox_events (auction_id, event_type, data, created_at)
         VALUES ($1, $2, $3, now())",
    )
    .bind(event.auction_id())
    .bind(event.event_type())
    .bind(data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// endregion: --- Enqueue

// region:    --- Outbox Relay

/// 아웃박스 릴레이
pub struct OutboxRelay {
    pool: Arc<PgPool>,
    producer: Arc<KafkaProducer>,
    topic: String,
    poll: Duration,
    batch_size: i64,
}

impl OutboxRelay {
    pub fn new(
        pool: Arc<PgPool>,
        producer: Arc<KafkaProducer>,
        topic: String,
        poll: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            pool,
            producer,
            topic,
            poll,
            batch_size,
        }
    }

    /// 릴레이 시작
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        let producer = Arc::clone(&self.producer);
        let topic = self.topic.clone();
        let poll = self.poll;
        let batch_size = self.batch_size;
        tokio::spawn(async move {
            let mut interval = interval(poll);
            loop {
                interval.tick().await;
                if let Err(e) = Self::drain(&pool, &producer, &topic, batch_size).await {
                    error!("{:<12} --> 아웃박스 발행 중 오류 발생: {}", "Outbox", e);
                }
            }
        });
    }

    /// 미발행 이벤트를 기록 순서대로 발행
    async fn drain(
        pool: &PgPool,
        producer: &KafkaProducer,
        topic: &str,
        batch_size: i64,
    ) -> Result<(), String> {
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT id, auction_id, data FROM outbox_events
             WHERE published_at IS NULL
             ORDER BY id
             LIMIT $1",
        )
        .bind(batch_size)
        .fetch_all(pool)
        .await
        .map_err(|e| e.to_string())?;

        for (id, auction_id, data) in rows {
            producer
                .send_message(topic, &auction_id.to_string(), &data)
                .await?;
            sqlx::query("UPDATE outbox_events SET published_at = now() WHERE id = $1")
                .bind(id)
                .execute(pool)
                .await
                .map_err(|e| e.to_string())?;
            debug!("{:<12} --> 이벤트 발행 완료: id={}", "Outbox", id);
        }
        Ok(())
    }
}

// endregion: --- Outbox Relay
