//! Job coordination.
//!
//! Validates a request, reserves a place in the usage ledger, waits for the
//! job to reach the head of the queue and runs the aggregation pipeline.
//! Every submission ends with exactly one terminal message unless the
//! caller has already gone away.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{info, Instrument};

use recap_models::{BatchJob, JobState, RejectionReason, StreamMessage, SummarizeRequest};
use recap_queue::{QueueSlot, UsageLedger};

use crate::aggregator::AggregationPipeline;
use crate::error::JOB_FAILED_MESSAGE;
use crate::logging::JobLogger;
use crate::metrics;
use crate::sink::ProgressSink;

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    Rejected(RejectionReason),
    Failed,
    Disconnected,
}

pub struct JobCoordinator {
    ledger: Arc<UsageLedger>,
    pipeline: Arc<AggregationPipeline>,
}

impl JobCoordinator {
    pub fn new(ledger: Arc<UsageLedger>, pipeline: Arc<AggregationPipeline>) -> Self {
        Self { ledger, pipeline }
    }

    pub fn ledger(&self) -> &Arc<UsageLedger> {
        &self.ledger
    }

    pub fn pipeline(&self) -> &Arc<AggregationPipeline> {
        &self.pipeline
    }

    /// Handle one summarize request end to end.
    pub async fn submit(&self, request: SummarizeRequest, sink: &ProgressSink) -> SubmitOutcome {
        let job = match BatchJob::from_request(request) {
            Ok(job) => job,
            Err(reason) => {
                info!(reason = reason.as_str(), "Rejected summarize request");
                metrics::record_job_rejected(reason.as_str());
                // Nothing was queued, so a gone caller changes nothing
                let _ = sink.send(StreamMessage::rejected(reason.message())).await;
                return SubmitOutcome::Rejected(reason);
            }
        };

        let logger = JobLogger::new(&job.id, "summarize");
        let span = logger.create_span();
        self.run_job(job, sink, logger).instrument(span).await
    }

    async fn run_job(&self, job: BatchJob, sink: &ProgressSink, logger: JobLogger) -> SubmitOutcome {
        let mut slot = self.ledger.reserve(job.id.clone(), job.size());
        metrics::record_job_enqueued();
        self.publish_depth();
        logger.log_start(&format!(
            "{} subject(s), budget {}, video {}",
            job.subjects.len(),
            job.budget,
            job.produce_video
        ));

        let outcome = self.admit_and_run(&job, &mut slot, sink, &logger).await;

        // Releases the ledger entry and the busy flag
        drop(slot);
        self.publish_depth();

        match outcome {
            SubmitOutcome::Completed => metrics::record_job_completed(),
            SubmitOutcome::Failed => metrics::record_job_failed(),
            SubmitOutcome::Disconnected => {
                logger.log_warning("Caller disconnected");
                metrics::record_job_disconnected();
            }
            SubmitOutcome::Rejected(_) => {}
        }
        outcome
    }

    async fn admit_and_run(
        &self,
        job: &BatchJob,
        slot: &mut QueueSlot,
        sink: &ProgressSink,
        logger: &JobLogger,
    ) -> SubmitOutcome {
        if sink.send(StreamMessage::queued(slot.ahead())).await.is_err() {
            return SubmitOutcome::Disconnected;
        }

        tokio::select! {
            admitted = slot.wait_for_turn() => {
                if !admitted {
                    logger.log_error("Job is no longer in the queue");
                    let _ = sink.send(StreamMessage::error(JOB_FAILED_MESSAGE)).await;
                    return SubmitOutcome::Failed;
                }
            }
            _ = sink.closed() => return SubmitOutcome::Disconnected,
        }
        logger.log_transition(JobState::Queued, JobState::Admitted);

        let run = AssertUnwindSafe(self.pipeline.run(job, sink, logger)).catch_unwind();
        let result = match run.await {
            Ok(result) => result,
            Err(_) => {
                logger.log_error("Pipeline panicked");
                let _ = sink.send(StreamMessage::error(JOB_FAILED_MESSAGE)).await;
                return SubmitOutcome::Failed;
            }
        };

        match result {
            Ok(output) => {
                let summaries = output.summaries.len();
                let budget_used = output.budget_used;
                let message =
                    StreamMessage::result(output.result_text, output.video_link, output.budget_used);
                if sink.send(message).await.is_err() {
                    return SubmitOutcome::Disconnected;
                }
                logger.log_completion(&format!(
                    "{} summaries, {} paid calls",
                    summaries, budget_used
                ));
                SubmitOutcome::Completed
            }
            Err(e) if e.is_disconnected() => SubmitOutcome::Disconnected,
            Err(e) => {
                logger.log_error(&e.to_string());
                let _ = sink.send(StreamMessage::error(e.user_message())).await;
                SubmitOutcome::Failed
            }
        }
    }

    fn publish_depth(&self) {
        metrics::set_queue_depth(self.ledger.pending_jobs(), self.ledger.pending_work());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::testing::{feed, image_item, video_item, FakeSource, FakeSummarizer, Fakes};
    use recap_models::JobId;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn coordinator(fakes: &Fakes) -> Arc<JobCoordinator> {
        let ledger = Arc::new(UsageLedger::new(recap_queue::LedgerConfig {
            poll_interval: Duration::from_millis(10),
        }));
        let pipeline = Arc::new(AggregationPipeline::new(
            fakes.collaborators(),
            PipelineConfig::default(),
        ));
        Arc::new(JobCoordinator::new(ledger, pipeline))
    }

    fn request(subjects: &[&str]) -> SummarizeRequest {
        SummarizeRequest {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            is_daily: false,
            preferences: "friends".to_string(),
            remaining_budget: 10.0,
        }
    }

    fn source() -> FakeSource {
        ["a1", "a2", "b1", "b2"].iter().fold(FakeSource::new(), |source, subject| {
            source.with_feed(feed(subject, vec![image_item(&format!("https://cdn/{}.jpg", subject))]))
        })
    }

    async fn drain(mut rx: mpsc::Receiver<StreamMessage>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_completed_job_emits_result() {
        let fakes = Fakes::new(source());
        let coordinator = coordinator(&fakes);
        let (sink, rx) = ProgressSink::channel(64);

        let outcome = coordinator.submit(request(&["a1"]), &sink).await;
        drop(sink);
        let messages = drain(rx).await;

        assert_eq!(outcome, SubmitOutcome::Completed);
        assert_eq!(messages.first(), Some(&StreamMessage::queued(0)));
        match messages.last() {
            Some(StreamMessage::Result { budget_used, .. }) => assert_eq!(*budget_used, 1.0),
            other => panic!("unexpected terminal message: {:?}", other),
        }
        assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
        assert_eq!(coordinator.ledger().pending_jobs(), 0);
        assert_eq!(coordinator.ledger().pending_work(), 0);
        assert!(!coordinator.ledger().is_busy());
    }

    #[tokio::test]
    async fn test_invalid_request_is_never_queued() {
        let fakes = Fakes::new(source());
        let coordinator = coordinator(&fakes);
        let (sink, rx) = ProgressSink::channel(8);

        let outcome = coordinator.submit(request(&["  "]), &sink).await;
        drop(sink);
        let messages = drain(rx).await;

        assert_eq!(outcome, SubmitOutcome::Rejected(RejectionReason::NoSubjects));
        assert_eq!(
            messages,
            vec![StreamMessage::rejected("No usernames have been provided")]
        );
        assert_eq!(coordinator.ledger().pending_jobs(), 0);
        assert_eq!(fakes.source.login_count(), 0);
    }

    #[tokio::test]
    async fn test_waits_behind_head_of_queue() {
        let fakes = Fakes::new(source());
        let coordinator = coordinator(&fakes);
        let blocker = coordinator.ledger().reserve(JobId::new(), 3);

        let (sink, mut rx) = ProgressSink::channel(64);
        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit(request(&["a1"]), &sink).await })
        };

        assert_eq!(rx.recv().await, Some(StreamMessage::queued(1)));
        assert_eq!(coordinator.ledger().pending_work(), 4);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(fakes.source.fetch_count(), 0);

        drop(blocker);
        assert_eq!(task.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(fakes.source.fetch_count(), 1);
        assert_eq!(coordinator.ledger().pending_work(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_while_queued_releases_slot() {
        let fakes = Fakes::new(source());
        let coordinator = coordinator(&fakes);
        let _blocker = coordinator.ledger().reserve(JobId::new(), 1);

        let (sink, mut rx) = ProgressSink::channel(64);
        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit(request(&["a1", "a2"]), &sink).await })
        };

        assert_eq!(rx.recv().await, Some(StreamMessage::queued(1)));
        assert_eq!(coordinator.ledger().pending_work(), 3);
        drop(rx);

        assert_eq!(task.await.unwrap(), SubmitOutcome::Disconnected);
        assert_eq!(coordinator.ledger().pending_jobs(), 1);
        assert_eq!(coordinator.ledger().pending_work(), 1);
        assert_eq!(fakes.source.login_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_jobs_run_one_at_a_time_in_order() {
        let fakes = Fakes::new(source());
        let coordinator = coordinator(&fakes);

        let (first_sink, first_rx) = ProgressSink::channel(64);
        let (second_sink, second_rx) = ProgressSink::channel(64);

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit(request(&["a1", "a2"]), &first_sink).await })
        };
        while coordinator.ledger().pending_jobs() == 0 && fakes.source.fetch_count() == 0 {
            tokio::task::yield_now().await;
        }
        let second = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit(request(&["b1", "b2"]), &second_sink).await })
        };

        assert_eq!(first.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(second.await.unwrap(), SubmitOutcome::Completed);
        assert_eq!(fakes.source.fetched(), vec!["a1", "a2", "b1", "b2"]);

        for rx in [first_rx, second_rx] {
            let messages = drain(rx).await;
            assert!(matches!(messages.last(), Some(StreamMessage::Result { .. })));
        }
        assert_eq!(coordinator.ledger().pending_work(), 0);
    }

    #[tokio::test]
    async fn test_backend_panic_releases_slot_with_one_terminal_message() {
        let source = FakeSource::new().with_feed(feed("a1", vec![video_item("https://cdn/boom.mp4")]));
        let fakes = Fakes::new(source)
            .with_video(FakeSummarizer::new().panicking("https://cdn/boom.mp4"));
        let coordinator = coordinator(&fakes);
        let (sink, rx) = ProgressSink::channel(64);

        let task = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.submit(request(&["a1"]), &sink).await })
        };
        assert_eq!(task.await.unwrap(), SubmitOutcome::Failed);
        let messages = drain(rx).await;

        assert_eq!(messages.iter().filter(|m| m.is_terminal()).count(), 1);
        match messages.last() {
            Some(StreamMessage::Error { message, .. }) => assert_eq!(message, JOB_FAILED_MESSAGE),
            other => panic!("unexpected terminal message: {:?}", other),
        }
        assert_eq!(coordinator.ledger().pending_jobs(), 0);
        assert_eq!(coordinator.ledger().pending_work(), 0);
        assert!(!coordinator.ledger().is_busy());
    }

    #[tokio::test]
    async fn test_login_failure_emits_error() {
        let fakes = Fakes::new(FakeSource::new().failing_login());
        let coordinator = coordinator(&fakes);
        let (sink, rx) = ProgressSink::channel(64);

        let outcome = coordinator.submit(request(&["a1"]), &sink).await;
        drop(sink);
        let messages = drain(rx).await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        match messages.last() {
            Some(StreamMessage::Error { message, .. }) => {
                assert_eq!(message, "Failed to log in to the content source")
            }
            other => panic!("unexpected terminal message: {:?}", other),
        }
        assert_eq!(coordinator.ledger().pending_jobs(), 0);
        assert!(!coordinator.ledger().is_busy());
    }
}
