/// 입찰자 잔액 조회 협력자
/// 잔액의 차감/충전은 주문 정산 서비스의 몫이고, 본 엔진은 입찰 수락 전의
/// 선행 조건 확인을 위해 읽기 전용으로만 참조한다.
// region:    --- Imports
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Balance Source

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// 사용 가능한 잔액 조회
    async fn available_balance(&self, user_id: i64) -> Result<i64, sqlx::Error>;
}

/// users 테이블의 balance 컬럼을 읽는 구현체
pub struct PostgresBalanceSource {
    pool: Arc<PgPool>,
}

impl PostgresBalanceSource {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BalanceSource for PostgresBalanceSource {
    async fn available_balance(&self, user_id: i64) -> Result<i64, sqlx::Error> {
        let balance: Option<i64> = sqlx::query_scalar("SELECT balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&*self.pool)
            .await?;
        // 알 수 없는 사용자는 잔액 0 으로 취급
        Ok(balance.unwrap_or(0))
    }
}

// endregion: --- Balance Source
