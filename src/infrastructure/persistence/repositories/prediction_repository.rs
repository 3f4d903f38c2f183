use crate::domain::history::{PredictionKind, PredictionRecord};
use crate::domain::repositories::PredictionRepository;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct SqlitePredictionRepository {
    pool: SqlitePool,
}

impl SqlitePredictionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PredictionRecord> {
    let kind_str: String = row.try_get("kind")?;
    let horizon_days: i64 = row.try_get("horizon_days")?;
    let horizon_days = u32::try_from(horizon_days).unwrap_or(0);

    let kind = match kind_str.as_str() {
        "single" => PredictionKind::Single { horizon_days },
        "recommendation" => PredictionKind::Recommendation {
            investment_amount: row
                .try_get::<Option<f64>, _>("investment_amount")?
                .unwrap_or(0.0),
            horizon_days,
        },
        other => bail!("Unknown prediction kind in database: {}", other),
    };

    let millis: i64 = row.try_get("created_at")?;
    let Some(created_at) = Utc.timestamp_millis_opt(millis).single() else {
        bail!("Invalid created_at timestamp: {}", millis);
    };

    Ok(PredictionRecord {
        user_id: row.try_get("user_id")?,
        symbol: row.try_get("symbol")?,
        kind,
        predicted_profit: row.try_get("predicted_profit")?,
        created_at,
    })
}

#[async_trait]
impl PredictionRepository for SqlitePredictionRepository {
    async fn save(&self, record: &PredictionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO predictions
            (user_id, symbol, kind, investment_amount, horizon_days, predicted_profit, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.symbol)
        .bind(record.kind.as_str())
        .bind(record.kind.investment_amount())
        .bind(i64::from(record.kind.horizon_days()))
        .bind(record.predicted_profit)
        .bind(record.created_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .context("Failed to save prediction")?;

        Ok(())
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT *, ROW_NUMBER() OVER (
                    PARTITION BY kind ORDER BY created_at DESC, id DESC
                ) AS kind_rank
                FROM predictions
                WHERE user_id = ?
            )
            WHERE kind_rank <= ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to load prediction history")?;

        rows.iter().map(record_from_row).collect()
    }
}
