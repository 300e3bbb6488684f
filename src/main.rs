use anyhow::Context;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drift_planner::config::{Config, RunMode, StoreBackend};
use drift_planner::models::Explanation;
use drift_planner::services::tuning_planner::PlanningTrace;
use drift_planner::services::{
    MemoryRowStore, MySqlRowStore, RowAggregateQuery, TuningPlanner,
};

#[derive(Serialize)]
struct PlanReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    attributes: &'a [String],
    #[serde(flatten)]
    trace: PlanningTrace,
}

#[derive(Serialize)]
struct MineReport<'a> {
    generated_at: chrono::DateTime<chrono::Utc>,
    attributes: &'a [String],
    /// Highest risk first
    explanations: Vec<Explanation>,
}

/// Runs the configured mode against `store` and renders the JSON report.
async fn run(store: &dyn RowAggregateQuery, config: &Config) -> Result<String, anyhow::Error> {
    let attributes = config.planner.attributes.as_slice();
    let planner_config = config.planner_config();

    let report = match config.mode {
        RunMode::Plan => {
            let trace = TuningPlanner::new(store, planner_config)
                .plan_with_trace(attributes)
                .await?;
            serde_json::to_string_pretty(&PlanReport {
                generated_at: chrono::Utc::now(),
                attributes,
                trace,
            })?
        },
        RunMode::Mine => {
            let explanations = TuningPlanner::new(store, planner_config).explain(attributes).await?;
            serde_json::to_string_pretty(&MineReport {
                generated_at: chrono::Utc::now(),
                attributes,
                explanations,
            })?
        },
    };
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();

    // Load configuration first
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the JSON report
    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    let _guard = if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("drift-planner.log");
        // Rolling appender adds the date suffix
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Some(guard)
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        None
    };
    tracing::info!("Drift planner starting up in {:?} mode", config.mode);

    let store = &config.store;
    let report = match store.backend {
        StoreBackend::Memory => {
            let rows_file = store
                .rows_file
                .as_deref()
                .context("store.rows_file is required for the memory backend")?;
            let memory = MemoryRowStore::from_json_file(
                rows_file,
                store.indicator_column.as_str(),
                store.neutralization_column.as_str(),
            )?;
            tracing::info!("Row store ready (memory backend)");
            run(&memory, &config).await?
        },
        StoreBackend::Mysql => {
            let mysql = MySqlRowStore::connect(
                &store.url,
                &store.table,
                &store.indicator_column,
                &store.neutralization_column,
            )?;
            tracing::info!("Row store ready (mysql backend)");
            let report = run(&mysql, &config).await;
            if let Err(e) = mysql.disconnect().await {
                tracing::warn!("Failed to disconnect MySQL pool: {}", e);
            }
            report?
        },
    };

    println!("{}", report);
    Ok(())
}
