use crate::model::search::SearchHistory;
use crate::AppState;
use chrono::{Duration, Local, Utc};
use std::error::Error;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

pub async fn start_jobs(state: AppState) -> Result<(), Box<dyn Error + Send + Sync>> {
    let retention_days = state.config.search.history_retention_days;

    let prune_search_history = Job::new_async_tz("0 0 3 * * *", Local, move |_uuid, _l| {
        let db = state.db.pool.clone();

        Box::pin(async move {
            info!("[Daily] Pruning search history older than {} days...", retention_days);

            let cutoff = (Utc::now() - Duration::days(retention_days)).timestamp_millis();
            match SearchHistory::prune(&db, cutoff).await {
                Ok(n) if n > 0 => info!("[Daily] Removed {} search history entries", n),
                Ok(_) => {}
                Err(err) => error!("[Daily] Failed to prune search history: {}", err),
            }
        })
    })?;

    let sched = JobScheduler::new().await?;
    sched.add(prune_search_history).await?;
    sched.start().await?;

    Ok(())
}
