use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            id UUID PRIMARY KEY,
            org_id VARCHAR(10) NOT NULL,
            recipient UUID NOT NULL,
            correlation_id UUID NOT NULL,
            url TEXT NOT NULL,
            timeout INTEGER NOT NULL CHECK (timeout >= 0),
            status VARCHAR(16) NOT NULL CHECK (status IN ('running', 'success', 'failure')),
            labels JSONB NOT NULL DEFAULT '{}',
            service VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            satellite_id UUID,
            satellite_org_id VARCHAR(255),
            name TEXT,
            web_console_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create run_hosts table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_hosts (
            id UUID PRIMARY KEY,
            run_id UUID NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            host TEXT NOT NULL,
            inventory_id UUID,
            status VARCHAR(16) NOT NULL CHECK (status IN ('running', 'success', 'failure')),
            stdout TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the list endpoints
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_org_created ON runs(org_id, created_at DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_recipient ON runs(recipient)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_labels ON runs USING GIN (labels)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_run_hosts_run_id ON run_hosts(run_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_run_hosts_inventory_id ON run_hosts(inventory_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
