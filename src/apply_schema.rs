use sqlx::PgPool;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = env::var("DATABASE_URL")?;
    let pool = PgPool::connect(&database_url).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            date DATE NOT NULL,
            route TEXT NOT NULL,
            customer TEXT NOT NULL,
            item TEXT NOT NULL,
            recommended_quantity INTEGER NOT NULL,
            tier TEXT NOT NULL,
            van_load INTEGER NOT NULL,
            priority_score DOUBLE PRECISION NOT NULL,
            avg_quantity_per_visit INTEGER NOT NULL,
            days_since_last_purchase INTEGER NOT NULL,
            purchase_cycle_days DOUBLE PRECISION NOT NULL,
            frequency_percent DOUBLE PRECISION NOT NULL,
            generated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            generated_by TEXT NOT NULL,
            PRIMARY KEY (date, route, customer, item)
        );
    "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recommendations_date_route ON recommendations (date, route);")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recommendations_customer_date ON recommendations (customer, date);")
        .execute(&pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS supervision_sessions (
            session_id TEXT PRIMARY KEY,
            route TEXT NOT NULL,
            date DATE NOT NULL,
            status TEXT NOT NULL,
            customers_planned INTEGER NOT NULL,
            customers_visited INTEGER NOT NULL,
            skus_recommended INTEGER NOT NULL,
            skus_sold INTEGER NOT NULL,
            qty_recommended BIGINT NOT NULL,
            qty_actual BIGINT NOT NULL,
            redistribution_count INTEGER NOT NULL,
            redistribution_qty BIGINT NOT NULL,
            performance_score DOUBLE PRECISION NOT NULL,
            record_version INTEGER NOT NULL,
            narrative TEXT,
            started_at TIMESTAMP WITH TIME ZONE NOT NULL,
            completed_at TIMESTAMP WITH TIME ZONE,
            UNIQUE (route, date)
        );
    "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS supervision_visits (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id TEXT NOT NULL REFERENCES supervision_sessions(session_id) ON DELETE CASCADE,
            customer TEXT NOT NULL,
            visit_sequence INTEGER NOT NULL,
            visit_timestamp TIMESTAMP WITH TIME ZONE NOT NULL,
            skus_recommended INTEGER NOT NULL,
            skus_sold INTEGER NOT NULL,
            qty_recommended BIGINT NOT NULL,
            qty_actual BIGINT NOT NULL,
            redistribution_count INTEGER NOT NULL,
            redistribution_qty BIGINT NOT NULL,
            customer_performance_score DOUBLE PRECISION NOT NULL,
            narrative TEXT,
            UNIQUE (session_id, customer)
        );
    "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS supervision_item_details (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            session_id TEXT NOT NULL REFERENCES supervision_sessions(session_id) ON DELETE CASCADE,
            customer TEXT NOT NULL,
            item TEXT NOT NULL,
            original_recommended_qty INTEGER NOT NULL,
            adjusted_recommended_qty INTEGER NOT NULL,
            original_actual_qty INTEGER NOT NULL,
            final_actual_qty INTEGER NOT NULL,
            was_manually_edited BOOLEAN NOT NULL,
            was_item_sold BOOLEAN NOT NULL,
            tier TEXT NOT NULL,
            priority_score DOUBLE PRECISION NOT NULL,
            van_inventory_qty INTEGER NOT NULL,
            days_since_last_purchase INTEGER NOT NULL,
            purchase_cycle_days DOUBLE PRECISION NOT NULL,
            purchase_frequency_pct DOUBLE PRECISION NOT NULL,
            UNIQUE (session_id, customer, item)
        );
    "#,
    )
    .execute(&pool)
    .await?;

    println!("Schema applied successfully");
    Ok(())
}
