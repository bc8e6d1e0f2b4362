use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

use super::assembly::{JobId, JobStatus, TranscriptJob, TranscriptionService};
use crate::{Result, ScribeError};

/// Transcription job processor
pub struct TranscriptionProcessor {
    service: Arc<dyn TranscriptionService>,
    job_id: JobId,
    interval: Duration,
    timeout: Duration,
}

impl TranscriptionProcessor {
    pub fn new(
        service: Arc<dyn TranscriptionService>,
        job_id: JobId,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            job_id,
            interval,
            timeout,
        }
    }

    /// Poll the job until it leaves queued/processing.
    ///
    /// Every check waits one interval first. A completed job is returned as-is; an `error`
    /// status or any status this client does not know ends polling with a failure. Network
    /// errors are not retried. If the next check would land past the deadline, or a status
    /// request is still pending when it passes, polling stops with [`ScribeError::PollTimeout`].
    pub async fn wait_for_completion(&self) -> Result<TranscriptJob> {
        let start_time = Instant::now();
        let deadline = start_time + self.timeout;
        let mut check_count = 0u32;

        loop {
            if Instant::now() + self.interval > deadline {
                return Err(self.timed_out(start_time, check_count));
            }

            sleep(self.interval).await;
            check_count += 1;

            // A status request still in flight at the deadline is abandoned
            let job = match timeout_at(deadline, self.service.fetch(&self.job_id)).await {
                Ok(fetched) => fetched.context("Failed to get transcription job status")?,
                Err(_) => return Err(self.timed_out(start_time, check_count)),
            };

            match job.status.clone() {
                status if status.is_pending() => {
                    tracing::debug!(
                        job_id = %self.job_id,
                        status = status.as_str(),
                        elapsed_secs = start_time.elapsed().as_secs(),
                        check_count,
                        "Transcribing..."
                    );
                }
                JobStatus::Completed => {
                    tracing::info!(
                        job_id = %self.job_id,
                        elapsed_secs = start_time.elapsed().as_secs(),
                        check_count,
                        "Transcription completed"
                    );
                    return Ok(job);
                }
                JobStatus::Error => {
                    let failure_reason = job.error.as_deref().unwrap_or("Unknown error");
                    tracing::error!(job_id = %self.job_id, reason = failure_reason, "Transcription error");
                    return Err(ScribeError::TranscriptionFailed(format!(
                        "job {} failed: {}",
                        self.job_id, failure_reason
                    ))
                    .into());
                }
                other => {
                    return Err(ScribeError::TranscriptionFailed(format!(
                        "unexpected status {} for job {}",
                        other.as_str(),
                        self.job_id
                    ))
                    .into());
                }
            }
        }
    }

    fn timed_out(&self, start_time: Instant, check_count: u32) -> anyhow::Error {
        tracing::warn!(job_id = %self.job_id, check_count, "Transcription polling timed out");
        ScribeError::PollTimeout {
            job_id: self.job_id.to_string(),
            waited_secs: start_time.elapsed().as_secs(),
        }
        .into()
    }
}
