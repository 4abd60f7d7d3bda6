// region:    --- Imports
use anyhow::{anyhow, Result};

// endregion: --- Imports

// region:    --- Config Model

/// 환경 변수 기반 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub api: ApiConfig,
    pub scheduler: SchedulerConfig,
    pub outbox: OutboxConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub recreate_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topic: String,
    pub partitions: i32,
    pub replication_factor: i32,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub poll_ms: u64,
    pub batch_size: i64,
}

// endregion: --- Config Model

// region:    --- Loading

pub fn load_config() -> Result<AppConfig> {
    Ok(AppConfig {
        database: DatabaseConfig {
            url: env_required("DATABASE_URL")?,
            max_connections: env_u32("DB_MAX_CONNECTIONS", 5),
            recreate_on_start: env_bool("DB_RECREATE_ON_START", false),
        },
        kafka: KafkaConfig {
            brokers: env_string("KAFKA_BROKERS", "localhost:9092"),
            topic: env_string("KAFKA_NOTIFICATIONS_TOPIC", "notifications"),
            partitions: env_i32("KAFKA_TOPIC_PARTITIONS", 5),
            replication_factor: env_i32("KAFKA_REPLICATION_FACTOR", 1),
        },
        api: ApiConfig {
            host: env_string("API_HOST", "0.0.0.0"),
            port: env_u16("API_PORT", 3000),
        },
        // 스케줄러 주기는 정확성이 아니라 지연에만 영향을 준다
        scheduler: SchedulerConfig {
            tick_seconds: env_u64("SCHEDULER_TICK_SECONDS", 1),
        },
        outbox: OutboxConfig {
            poll_ms: env_u64("OUTBOX_POLL_MS", 500),
            batch_size: env_i64("OUTBOX_BATCH_SIZE", 100),
        },
    })
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {key}"))
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

// endregion: --- Loading
