//! In-memory collaborators for pipeline and coordinator tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use recap_ai::{AiError, AiResult, FoldRequest, MediaSummarizer, MediaSummary, SummaryFolder};
use recap_cache::CacheGateway;
use recap_models::{MediaRef, StoryItem, SubjectFeed, SubjectProfile};
use recap_render::{RenderRequest, RenderResult, RenderStatus, VideoComposer};
use recap_source::{ContentSource, Session, SourceError, SourceResult};

use crate::aggregator::Collaborators;

pub fn video_item(url: &str) -> StoryItem {
    StoryItem {
        id: url.to_string(),
        videos: vec![MediaRef {
            url: url.to_string(),
        }],
        ..Default::default()
    }
}

pub fn image_item(url: &str) -> StoryItem {
    StoryItem {
        id: url.to_string(),
        images: vec![MediaRef {
            url: url.to_string(),
        }],
        ..Default::default()
    }
}

pub fn feed(subject: &str, items: Vec<StoryItem>) -> SubjectFeed {
    SubjectFeed {
        profile: SubjectProfile {
            username: subject.to_string(),
            ..Default::default()
        },
        items,
    }
}

/// Content source serving canned feeds.
#[derive(Default)]
pub struct FakeSource {
    feeds: Mutex<HashMap<String, SubjectFeed>>,
    logins: AtomicUsize,
    fetched: Mutex<Vec<String>>,
    reject_resume: bool,
    fail_login: bool,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, feed: SubjectFeed) -> Self {
        self.feeds
            .lock()
            .unwrap()
            .insert(feed.profile.username.clone(), feed);
        self
    }

    pub fn rejecting_resume(mut self) -> Self {
        self.reject_resume = true;
        self
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    /// Subjects fetched so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn authenticate(&self, login: &str, _password: &str) -> SourceResult<Session> {
        if self.fail_login {
            return Err(SourceError::authentication_failed("bad credentials"));
        }
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session::new(login, format!("token-{}", n)))
    }

    async fn resume(&self, blob: &str) -> SourceResult<Session> {
        if self.reject_resume {
            return Err(SourceError::SessionRejected("expired".to_string()));
        }
        Session::import(blob)
    }

    async fn fetch_feed(&self, _session: &Session, subject: &str) -> SourceResult<SubjectFeed> {
        self.fetched.lock().unwrap().push(subject.to_string());
        self.feeds
            .lock()
            .unwrap()
            .get(subject)
            .cloned()
            .ok_or_else(|| SourceError::SubjectNotFound(subject.to_string()))
    }
}

/// Media summarizer answering from a table, with a default for unknown URLs.
#[derive(Default)]
pub struct FakeSummarizer {
    responses: Mutex<HashMap<String, MediaSummary>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, description: &str, add_it: bool, clip_length: u32) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            MediaSummary {
                description: description.to_string(),
                add_it,
                clip_length,
            },
        );
        self
    }

    pub fn failing(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn panicking(self, url: &str) -> Self {
        self.panicking.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaSummarizer for FakeSummarizer {
    async fn summarize(&self, url: &str, _prompt: &str) -> AiResult<MediaSummary> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.failing.lock().unwrap().contains(url) {
            return Err(AiError::invalid_response("unreadable"));
        }
        let panics = self.panicking.lock().unwrap().contains(url);
        if panics {
            panic!("summarizer blew up on {}", url);
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| MediaSummary {
                description: format!("Summary of {}", url),
                add_it: true,
                clip_length: 3,
            }))
    }
}

/// Folder that joins its inputs, or returns a fixed answer.
#[derive(Default)]
pub struct FakeFolder {
    fixed: Option<String>,
    fail: bool,
    requests: Mutex<Vec<FoldRequest>>,
}

impl FakeFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(mut self, text: &str) -> Self {
        self.fixed = Some(text.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requests(&self) -> Vec<FoldRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummaryFolder for FakeFolder {
    async fn fold(&self, request: &FoldRequest) -> AiResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(AiError::invalid_response("fold failed"));
        }
        if let Some(fixed) = &self.fixed {
            return Ok(fixed.clone());
        }
        Ok(request
            .summaries
            .iter()
            .map(|s| s.summary.as_str())
            .collect::<Vec<_>>()
            .join("; "))
    }
}

/// Composer whose renders finish immediately.
#[derive(Default)]
pub struct FakeComposer {
    fail: bool,
    submitted: Mutex<Vec<RenderRequest>>,
}

impl FakeComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn submitted(&self) -> Vec<RenderRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoComposer for FakeComposer {
    async fn submit(&self, request: &RenderRequest) -> RenderResult<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        Ok(format!("render-{}", submitted.len()))
    }

    async fn poll(&self, render_id: &str) -> RenderResult<RenderStatus> {
        if self.fail {
            return Ok(RenderStatus::Failed("asset unreachable".to_string()));
        }
        Ok(RenderStatus::Ready(format!("https://renders/{}.mp4", render_id)))
    }
}

/// Handles to the fakes behind a [`Collaborators`] set.
pub struct Fakes {
    pub source: Arc<FakeSource>,
    pub video: Arc<FakeSummarizer>,
    pub image: Arc<FakeSummarizer>,
    pub folder: Arc<FakeFolder>,
    pub composer: Arc<FakeComposer>,
    pub cache: CacheGateway,
}

impl Fakes {
    pub fn new(source: FakeSource) -> Self {
        Self {
            source: Arc::new(source),
            video: Arc::new(FakeSummarizer::new()),
            image: Arc::new(FakeSummarizer::new()),
            folder: Arc::new(FakeFolder::new()),
            composer: Arc::new(FakeComposer::new()),
            cache: CacheGateway::in_memory(),
        }
    }

    pub fn with_video(mut self, video: FakeSummarizer) -> Self {
        self.video = Arc::new(video);
        self
    }

    pub fn with_image(mut self, image: FakeSummarizer) -> Self {
        self.image = Arc::new(image);
        self
    }

    pub fn with_folder(mut self, folder: FakeFolder) -> Self {
        self.folder = Arc::new(folder);
        self
    }

    pub fn with_composer(mut self, composer: FakeComposer) -> Self {
        self.composer = Arc::new(composer);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            source: self.source.clone(),
            video: self.video.clone(),
            image: self.image.clone(),
            folder: self.folder.clone(),
            composer: Some(self.composer.clone()),
            cache: self.cache.clone(),
        }
    }

    /// Total paid media calls across both summarizers.
    pub fn media_calls(&self) -> usize {
        self.video.call_count() + self.image.call_count()
    }
}
