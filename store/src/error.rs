use thiserror::Error;

/// Errors surfaced by the presence store.
///
/// Mirrors the `#[from]`-heavy enum style the teacher uses for domain
/// errors (see `db::achievement_engine::AchievementError`): one variant per
/// underlying failure mode, propagated with `?` rather than unwrapped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
