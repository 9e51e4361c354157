//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Memory hygiene only: OTP expiry and rate-limit windows are enforced by
//! timestamp comparison on every request, so nothing breaks if these never run.
//!
//! ```text
//! Scheduler (every hour)
//!     │
//!     └─► OtpEngine::sweep_expired()
//!             ├─► drop elapsed rate-limit windows
//!             └─► drop expired OTP records
//! ```

use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::auth::OtpEngine;

/// Start all scheduled tasks
pub async fn start_scheduler(otp: Arc<OtpEngine>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Expired auth state sweep - runs every hour
    let sweep_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let otp = otp.clone();
        Box::pin(async move {
            let stats = otp.sweep_expired().await;
            tracing::info!(
                rate_limit_entries = stats.rate_limit_entries,
                otp_records = stats.otp_records,
                "Hourly auth sweep finished"
            );
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (auth state sweep every hour)");
    Ok(scheduler)
}
