//! Story aggregation pipeline.
//!
//! Walks the job's subjects in order. For each one it loads the weekly
//! history, fetches the feed, summarizes one media per item (cache first,
//! then a paid backend call within the budget), folds the item summaries
//! into a single line and records it. Afterwards it optionally composes a
//! recap video from the collected highlights.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use recap_ai::{FoldRequest, MediaSummarizer, SummaryFolder};
use recap_cache::CacheGateway;
use recap_models::{
    is_nothing_interesting, BatchJob, CachedSummary, HighlightAsset, JobState, MediaKind,
    SubjectHistory, SubjectSummary, NOTHING_INTERESTING,
};
use recap_render::{build_timeline, VideoComposer};
use recap_source::{ContentSource, Session};

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::prompt::ItemPrompt;
use crate::session::resolve_session;
use crate::sink::ProgressSink;

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ContentSource>,
    pub video: Arc<dyn MediaSummarizer>,
    pub image: Arc<dyn MediaSummarizer>,
    pub folder: Arc<dyn SummaryFolder>,
    /// `None` disables video composition
    pub composer: Option<Arc<dyn VideoComposer>>,
    pub cache: CacheGateway,
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub summaries: Vec<SubjectSummary>,
    /// JSON array of `summaries`
    pub result_text: String,
    /// Empty when no video was requested or produced
    pub video_link: String,
    pub budget_used: u32,
    pub budget_exhausted: bool,
}

/// Per-job mutable state.
struct JobRun {
    limit: f64,
    calls_made: u32,
    exhausted: bool,
    highlights: Vec<HighlightAsset>,
    output: Vec<SubjectSummary>,
}

impl JobRun {
    fn new(limit: f64) -> Self {
        Self {
            limit,
            calls_made: 0,
            exhausted: false,
            highlights: Vec::new(),
            output: Vec::new(),
        }
    }

    fn can_call(&self) -> bool {
        f64::from(self.calls_made) < self.limit
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct AggregationPipeline {
    collaborators: Collaborators,
    config: PipelineConfig,
}

impl AggregationPipeline {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.collaborators.cache
    }

    /// Run an admitted job to completion.
    ///
    /// Only session failure, output encoding and a closed sink end the run
    /// early; everything else degrades per subject or per item.
    pub async fn run(
        &self,
        job: &BatchJob,
        sink: &ProgressSink,
        logger: &JobLogger,
    ) -> PipelineResult<PipelineOutput> {
        logger.log_transition(JobState::Admitted, JobState::Authenticating);
        let session = match resolve_session(
            self.collaborators.source.as_ref(),
            &self.collaborators.cache,
            &self.config.login,
            &self.config.password,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                logger.log_transition(JobState::Authenticating, JobState::Failed);
                return Err(e);
            }
        };
        sink.progress("Logged in").await?;

        logger.log_transition(JobState::Authenticating, JobState::ProcessingSubjects);
        let mut run = JobRun::new(job.budget);

        for (index, subject) in job.subjects.iter().enumerate() {
            if run.exhausted {
                let remaining = job.subjects.len() - index;
                logger.log_warning(&format!(
                    "Budget exhausted, skipping {} remaining subject(s)",
                    remaining
                ));
                sink.progress(format!(
                    "Usage limit reached, skipping {} remaining subject(s)",
                    remaining
                ))
                .await?;
                break;
            }
            self.process_subject(&session, subject, job, &mut run, sink, logger)
                .await?;
        }

        let result_text = serde_json::to_string(&run.output)?;

        let mut state = JobState::ProcessingSubjects;
        let video_link = if job.produce_video {
            logger.log_transition(state, JobState::Composing);
            state = JobState::Composing;
            sink.progress("Composing video").await?;
            self.compose(&run.highlights, logger).await
        } else {
            String::new()
        };

        logger.log_transition(state, JobState::Completed);
        Ok(PipelineOutput {
            summaries: run.output,
            result_text,
            video_link,
            budget_used: run.calls_made,
            budget_exhausted: run.exhausted,
        })
    }

    async fn load_history(&self, subject: &str) -> SubjectHistory {
        match self.collaborators.cache.get_history(subject).await {
            Some(raw) => SubjectHistory::from_json(&raw).unwrap_or_else(|e| {
                warn!(subject = %subject, "Discarding undecodable history: {}", e);
                SubjectHistory::new()
            }),
            None => SubjectHistory::new(),
        }
    }

    fn summarizer(&self, kind: MediaKind) -> &dyn MediaSummarizer {
        match kind {
            MediaKind::Video => self.collaborators.video.as_ref(),
            MediaKind::Image => self.collaborators.image.as_ref(),
        }
    }

    async fn process_subject(
        &self,
        session: &Session,
        subject: &str,
        job: &BatchJob,
        run: &mut JobRun,
        sink: &ProgressSink,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        let mut history = self.load_history(subject).await;

        sink.progress("Visiting profile").await?;
        let feed = match self.collaborators.source.fetch_feed(session, subject).await {
            Ok(feed) => feed,
            Err(e) => {
                logger.log_warning(&format!("Skipping {}: {}", subject, e));
                sink.progress(format!("Could not load stories of {}", subject))
                    .await?;
                return Ok(());
            }
        };
        sink.progress("Getting stories").await?;

        let profile = &feed.profile;
        let mut accumulated: Vec<SubjectSummary> = Vec::new();

        for item in &feed.items {
            let Some((kind, url)) = item.primary_media() else {
                continue;
            };

            let entry = match self.collaborators.cache.get_summary(url).await {
                Some(hit) => {
                    metrics::record_cache_lookup(true);
                    hit
                }
                None => {
                    metrics::record_cache_lookup(false);
                    if !run.can_call() {
                        run.exhausted = true;
                        logger.log_warning(&format!(
                            "Budget of {} calls exhausted at {}",
                            run.limit, subject
                        ));
                        break;
                    }

                    let prompt = ItemPrompt {
                        subject,
                        kind,
                        is_business: profile.is_business,
                        accumulated: &accumulated,
                        history: &history,
                        metadata: &item.metadata,
                    }
                    .render();

                    // Charged whether or not the call succeeds
                    run.calls_made += 1;
                    match self.summarizer(kind).summarize(url, &prompt).await {
                        Ok(summary) => {
                            metrics::record_backend_call(kind.as_str(), true);
                            let entry = CachedSummary::new(
                                summary.description,
                                summary.add_it,
                                summary.clip_length,
                            );
                            self.collaborators
                                .cache
                                .put_summary(url, &entry, self.config.summary_ttl)
                                .await;
                            entry
                        }
                        Err(e) => {
                            metrics::record_backend_call(kind.as_str(), false);
                            warn!(subject = %subject, url = %url, "Failed to summarize {}: {}", kind, e);
                            continue;
                        }
                    }
                }
            };

            if entry.add_it {
                run.highlights
                    .push(HighlightAsset::new(kind, url, entry.clip_length));
            }

            if !entry.is_nothing_interesting() {
                let summary = SubjectSummary::new(subject, entry.description.trim());
                if profile.followed_by {
                    accumulated.insert(0, summary);
                } else {
                    accumulated.push(summary);
                }
            }

            sink.progress(entry.description).await?;
        }

        let folded = if accumulated.is_empty() {
            NOTHING_INTERESTING.to_string()
        } else {
            let request = FoldRequest {
                summaries: accumulated,
                is_business: profile.is_business,
                preferences: job.preferences.clone(),
            };
            match self.collaborators.folder.fold(&request).await {
                Ok(folded) => {
                    metrics::record_backend_call("fold", true);
                    folded
                }
                Err(e) => {
                    metrics::record_backend_call("fold", false);
                    logger.log_warning(&format!("Failed to fold summaries of {}: {}", subject, e));
                    return Ok(());
                }
            }
        };

        if is_nothing_interesting(&folded) {
            debug!(subject = %subject, "Nothing interesting to record");
            return Ok(());
        }

        let folded = folded.trim().to_string();
        if history.record(&folded, today()) {
            match history.to_json() {
                Ok(raw) => {
                    self.collaborators
                        .cache
                        .put_history(subject, &raw, self.config.history_ttl)
                        .await
                }
                Err(e) => warn!(subject = %subject, "Failed to encode history: {}", e),
            }
        } else {
            debug!(subject = %subject, "History already has an entry for today");
        }

        run.output.push(SubjectSummary::new(subject, folded));
        Ok(())
    }

    /// Render the highlights. Any failure yields an empty link.
    async fn compose(&self, highlights: &[HighlightAsset], logger: &JobLogger) -> String {
        let Some(composer) = &self.collaborators.composer else {
            logger.log_warning("Video requested but no composer is configured");
            return String::new();
        };

        let Some(request) = build_timeline(highlights, &self.config.soundtrack_url) else {
            logger.log_progress("No playable highlights, skipping render");
            metrics::record_render("empty");
            return String::new();
        };

        let render_id = match composer.submit(&request).await {
            Ok(id) => id,
            Err(e) => {
                logger.log_warning(&format!("Failed to submit render: {}", e));
                metrics::record_render("failed");
                return String::new();
            }
        };

        match composer
            .wait_for_url(&render_id, self.config.render_poll_interval)
            .await
        {
            Ok(url) => {
                metrics::record_render("ready");
                logger.log_progress(&format!("Render {} ready", render_id));
                url
            }
            Err(e) => {
                logger.log_warning(&format!("Render {} failed: {}", render_id, e));
                metrics::record_render("failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{feed, image_item, video_item, FakeComposer, FakeFolder, FakeSource, FakeSummarizer, Fakes};
    use recap_models::{StreamMessage, SummarizeRequest, HISTORY_DATE_FORMAT};
    use std::time::Duration;

    fn job(subjects: &[&str], budget: f64, produce_video: bool) -> BatchJob {
        BatchJob::from_request(SummarizeRequest {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            is_daily: produce_video,
            preferences: "close friends".to_string(),
            remaining_budget: budget,
        })
        .unwrap()
    }

    async fn run(fakes: &Fakes, job: &BatchJob) -> (PipelineResult<PipelineOutput>, Vec<StreamMessage>) {
        let pipeline = AggregationPipeline::new(
            fakes.collaborators(),
            PipelineConfig {
                login: "svc".to_string(),
                render_poll_interval: Duration::from_millis(5),
                ..Default::default()
            },
        );
        let (sink, mut rx) = ProgressSink::channel(256);
        let logger = JobLogger::new(&job.id, "test");

        let result = pipeline.run(job, &sink, &logger).await;
        drop(sink);

        let mut messages = Vec::new();
        while let Some(message) = rx.recv().await {
            messages.push(message);
        }
        (result, messages)
    }

    fn progress_texts(messages: &[StreamMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                StreamMessage::Progress { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn today_suffix() -> String {
        today().format(HISTORY_DATE_FORMAT).to_string()
    }

    fn five_images(subject: &str) -> FakeSource {
        FakeSource::new().with_feed(feed(
            subject,
            (1..=5)
                .map(|i| image_item(&format!("https://cdn/{}/{}.jpg", subject, i)))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_budget_caps_backend_calls() {
        let fakes = Fakes::new(five_images("alice"));
        let (result, _) = run(&fakes, &job(&["alice"], 3.0, false)).await;
        let output = result.unwrap();

        assert_eq!(fakes.media_calls(), 3);
        assert_eq!(output.budget_used, 3);
        assert!(output.budget_exhausted);
        assert_eq!(output.summaries.len(), 1);
        assert_eq!(output.summaries[0].author, "alice");
    }

    #[tokio::test]
    async fn test_replay_hits_cache() {
        let fakes = Fakes::new(five_images("alice"));
        let job = job(&["alice"], 10.0, false);

        let (first, _) = run(&fakes, &job).await;
        assert_eq!(first.unwrap().budget_used, 5);

        let (second, _) = run(&fakes, &job).await;
        let second = second.unwrap();
        assert_eq!(second.budget_used, 0);
        assert_eq!(fakes.media_calls(), 5);
        assert_eq!(second.summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_subjects_processed_in_order() {
        let source = FakeSource::new()
            .with_feed(feed("a", vec![image_item("https://cdn/a1.jpg"), image_item("https://cdn/a2.jpg")]))
            .with_feed(feed("b", vec![video_item("https://cdn/b1.mp4")]));
        let fakes = Fakes::new(source);

        let (result, messages) = run(&fakes, &job(&["a", "b"], 10.0, false)).await;
        let output = result.unwrap();

        let texts = progress_texts(&messages);
        let position = |needle: &str| texts.iter().position(|t| t.contains(needle)).unwrap();
        assert_eq!(texts[0], "Logged in");
        assert!(position("a1.jpg") < position("a2.jpg"));
        assert!(position("a2.jpg") < position("b1.mp4"));

        let authors: Vec<_> = output.summaries.iter().map(|s| s.author.as_str()).collect();
        assert_eq!(authors, vec!["a", "b"]);
        assert!(!output.result_text.is_empty());
        assert_eq!(output.video_link, "");
        assert_eq!(fakes.video.calls(), vec!["https://cdn/b1.mp4"]);
        assert_eq!(fakes.image.call_count(), 2);

        let decoded: Vec<SubjectSummary> = serde_json::from_str(&output.result_text).unwrap();
        assert_eq!(decoded, output.summaries);
    }

    #[tokio::test]
    async fn test_same_day_adds_single_history_entry() {
        let fakes = Fakes::new(five_images("alice"));
        let job = job(&["alice"], 10.0, false);

        run(&fakes, &job).await.0.unwrap();
        let (second, _) = run(&fakes, &job).await;

        let history = SubjectHistory::from_json(&fakes.cache.get_history("alice").await.unwrap()).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history.entries()[0].ends_with(&today_suffix()));
        assert_eq!(second.unwrap().summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_history_keeps_last_seven() {
        let fakes = Fakes::new(five_images("alice"));
        let old: Vec<String> = (1..=7).map(|d| format!("Day {} 0{}.01.2020", d, d)).collect();
        fakes
            .cache
            .put_history("alice", &serde_json::to_string(&old).unwrap(), Duration::from_secs(60))
            .await;

        run(&fakes, &job(&["alice"], 10.0, false)).await.0.unwrap();

        let history = SubjectHistory::from_json(&fakes.cache.get_history("alice").await.unwrap()).unwrap();
        assert_eq!(history.len(), 7);
        assert_eq!(history.entries()[0], "Day 2 02.01.2020");
        assert!(history.entries()[6].ends_with(&today_suffix()));
    }

    #[tokio::test]
    async fn test_sentinel_items_are_not_folded() {
        let source = FakeSource::new().with_feed(feed(
            "alice",
            vec![image_item("https://cdn/dull.jpg"), image_item("https://cdn/fun.jpg")],
        ));
        let fakes = Fakes::new(source).with_image(
            FakeSummarizer::new()
                .with_response("https://cdn/dull.jpg", "Nothing interesting", false, 0)
                .with_response("https://cdn/fun.jpg", "Started a band", true, 4),
        );

        let (result, messages) = run(&fakes, &job(&["alice"], 10.0, false)).await;
        result.unwrap();

        let requests = fakes.folder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].summaries, vec![SubjectSummary::new("alice", "Started a band")]);
        assert_eq!(requests[0].preferences, "close friends");
        // Sentinel descriptions are still reported as progress
        assert!(progress_texts(&messages).contains(&"Nothing interesting".to_string()));
    }

    #[tokio::test]
    async fn test_all_sentinel_skips_fold_and_output() {
        let source = FakeSource::new().with_feed(feed("alice", vec![image_item("https://cdn/dull.jpg")]));
        let fakes = Fakes::new(source).with_image(
            FakeSummarizer::new().with_response("https://cdn/dull.jpg", "Nothing interesting", false, 0),
        );

        let output = run(&fakes, &job(&["alice"], 10.0, false)).await.0.unwrap();
        assert!(fakes.folder.requests().is_empty());
        assert!(output.summaries.is_empty());
        assert_eq!(output.result_text, "[]");
        assert_eq!(fakes.cache.get_history("alice").await, None);
    }

    #[tokio::test]
    async fn test_mutual_follow_prepends() {
        let mut subject_feed = feed(
            "bob",
            vec![image_item("https://cdn/first.jpg"), image_item("https://cdn/second.jpg")],
        );
        subject_feed.profile.followed_by = true;
        let fakes = Fakes::new(FakeSource::new().with_feed(subject_feed));

        run(&fakes, &job(&["bob"], 10.0, false)).await.0.unwrap();

        let summaries: Vec<_> = fakes.folder.requests()[0]
            .summaries
            .iter()
            .map(|s| s.summary.clone())
            .collect();
        assert_eq!(
            summaries,
            vec!["Summary of https://cdn/second.jpg", "Summary of https://cdn/first.jpg"]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_subject() {
        let fakes = Fakes::new(five_images("alice"));
        let (result, messages) = run(&fakes, &job(&["ghost", "alice"], 10.0, false)).await;
        let output = result.unwrap();

        assert_eq!(output.summaries.len(), 1);
        assert_eq!(output.summaries[0].author, "alice");
        assert!(progress_texts(&messages).iter().any(|t| t.contains("ghost")));
    }

    #[tokio::test]
    async fn test_fold_failure_skips_subject() {
        let fakes = Fakes::new(five_images("alice")).with_folder(FakeFolder::new().failing());
        let output = run(&fakes, &job(&["alice"], 10.0, false)).await.0.unwrap();

        assert!(output.summaries.is_empty());
        assert_eq!(fakes.cache.get_history("alice").await, None);
    }

    #[tokio::test]
    async fn test_failed_call_consumes_budget() {
        let source = FakeSource::new().with_feed(feed(
            "alice",
            vec![image_item("https://cdn/broken.jpg"), image_item("https://cdn/ok.jpg")],
        ));
        let fakes = Fakes::new(source).with_image(FakeSummarizer::new().failing("https://cdn/broken.jpg"));

        let output = run(&fakes, &job(&["alice"], 10.0, false)).await.0.unwrap();
        assert_eq!(output.budget_used, 2);
        assert_eq!(fakes.cache.get_summary("https://cdn/broken.jpg").await, None);
        assert!(fakes.cache.get_summary("https://cdn/ok.jpg").await.is_some());
    }

    #[tokio::test]
    async fn test_exhaustion_skips_remaining_subjects() {
        let source = five_images("alice").with_feed(feed("bob", vec![image_item("https://cdn/bob.jpg")]));
        let fakes = Fakes::new(source);

        let (result, messages) = run(&fakes, &job(&["alice", "bob"], 1.0, false)).await;
        let output = result.unwrap();

        assert_eq!(fakes.media_calls(), 1);
        assert_eq!(fakes.source.fetch_count(), 1);
        assert_eq!(output.summaries.len(), 1);
        assert_eq!(output.summaries[0].author, "alice");
        assert!(progress_texts(&messages).iter().any(|t| t.contains("Usage limit reached")));
    }

    #[tokio::test]
    async fn test_video_composition() {
        let source = FakeSource::new().with_feed(feed(
            "alice",
            vec![video_item("https://cdn/v.mp4"), image_item("https://cdn/zero.jpg")],
        ));
        let fakes = Fakes::new(source)
            .with_video(FakeSummarizer::new().with_response("https://cdn/v.mp4", "Concert", true, 6))
            .with_image(FakeSummarizer::new().with_response("https://cdn/zero.jpg", "Menu", true, 0));

        let output = run(&fakes, &job(&["alice"], 10.0, true)).await.0.unwrap();

        assert_eq!(output.video_link, "https://renders/render-1.mp4");
        let submitted = fakes.composer.submitted();
        let clips: Vec<_> = submitted[0].clips().collect();
        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].asset.src, "https://cdn/v.mp4");
        assert_eq!(clips[0].length, 6);
    }

    #[tokio::test]
    async fn test_oversized_clip_lengths_are_capped() {
        let source = FakeSource::new().with_feed(feed(
            "alice",
            vec![video_item("https://cdn/a.mp4"), video_item("https://cdn/b.mp4")],
        ));
        let fakes = Fakes::new(source).with_video(
            FakeSummarizer::new()
                .with_response("https://cdn/a.mp4", "Marathon", true, 3_000_000_000)
                .with_response("https://cdn/b.mp4", "Finish line", true, 3_000_000_000),
        );

        let output = run(&fakes, &job(&["alice"], 10.0, true)).await.0.unwrap();

        assert!(!output.video_link.is_empty());
        let submitted = fakes.composer.submitted();
        let clips: Vec<_> = submitted[0].clips().collect();
        assert_eq!(clips.len(), 2);
        assert!(clips.iter().all(|c| c.length == recap_models::MAX_CLIP_SECONDS));
        assert_eq!(clips[1].start, recap_models::MAX_CLIP_SECONDS - 1);
    }

    #[tokio::test]
    async fn test_cache_hit_still_contributes_highlight() {
        let source = FakeSource::new().with_feed(feed("alice", vec![video_item("https://cdn/v.mp4")]));
        let fakes = Fakes::new(source);
        fakes
            .cache
            .put_summary(
                "https://cdn/v.mp4",
                &CachedSummary::new("Road trip", true, 5),
                Duration::from_secs(60),
            )
            .await;

        let output = run(&fakes, &job(&["alice"], 10.0, true)).await.0.unwrap();
        assert_eq!(output.budget_used, 0);
        assert_eq!(fakes.composer.submitted().len(), 1);
        assert!(!output.video_link.is_empty());
    }

    #[tokio::test]
    async fn test_empty_timeline_skips_render() {
        let source = FakeSource::new().with_feed(feed("alice", vec![image_item("https://cdn/a.jpg")]));
        let fakes = Fakes::new(source)
            .with_image(FakeSummarizer::new().with_response("https://cdn/a.jpg", "Lunch", false, 0));

        let output = run(&fakes, &job(&["alice"], 10.0, true)).await.0.unwrap();
        assert_eq!(output.video_link, "");
        assert!(fakes.composer.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_yields_empty_link() {
        let fakes = Fakes::new(five_images("alice")).with_composer(FakeComposer::new().failing());
        let output = run(&fakes, &job(&["alice"], 10.0, true)).await.0.unwrap();

        assert_eq!(fakes.composer.submitted().len(), 1);
        assert_eq!(output.video_link, "");
        assert_eq!(output.summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_login_failure_is_fatal() {
        let fakes = Fakes::new(FakeSource::new().failing_login());
        let (result, messages) = run(&fakes, &job(&["alice"], 10.0, false)).await;

        assert!(result.unwrap_err().is_fatal());
        assert!(messages.is_empty());
        assert_eq!(fakes.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_sink_aborts() {
        let fakes = Fakes::new(five_images("alice"));
        let pipeline = AggregationPipeline::new(fakes.collaborators(), PipelineConfig::default());
        let job = job(&["alice"], 10.0, false);
        let (sink, rx) = ProgressSink::channel(8);
        drop(rx);

        let err = pipeline
            .run(&job, &sink, &JobLogger::new(&job.id, "test"))
            .await
            .unwrap_err();
        assert!(err.is_disconnected());
        assert_eq!(fakes.media_calls(), 0);
    }
}
