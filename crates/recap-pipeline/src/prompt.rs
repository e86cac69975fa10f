//! Per-item prompt construction.

use recap_models::{MediaKind, StoryMetadata, SubjectHistory, SubjectSummary, NOTHING_INTERESTING};

/// Everything an item prompt depends on.
pub struct ItemPrompt<'a> {
    pub subject: &'a str,
    pub kind: MediaKind,
    pub is_business: bool,
    /// Summaries already produced for this subject in this job
    pub accumulated: &'a [SubjectSummary],
    pub history: &'a SubjectHistory,
    pub metadata: &'a StoryMetadata,
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

impl ItemPrompt<'_> {
    pub fn render(&self) -> String {
        let media = match self.kind {
            MediaKind::Video => "a video",
            MediaKind::Image => "an image",
        };

        let focus = if self.is_business {
            "news, launches or sales of this business"
        } else {
            "this person's life or news"
        };

        let earlier = if self.accumulated.is_empty() {
            "none".to_string()
        } else {
            self.accumulated
                .iter()
                .map(|s| s.summary.as_str())
                .collect::<Vec<_>>()
                .join(" | ")
        };

        let metadata = self.metadata;
        format!(
            "Here is {media} from {subject}'s story (refer to them as {subject}, never as \
'user'). Decide whether it shows anything interesting or relevant about {focus}. If it does, \
summarize it in one short, simple sentence. Otherwise respond with '{sentinel}'.\n\
Keep it consistent with the earlier stories from today: {earlier}.\n\
Stories from the last 7 days: {history}.\n\
Do not repeat what those already say.\n\
Story details: events: {events}; hashtags: {hashtags}; polls: {polls}; locations: {locations}; \
questions: {questions}; sliders: {sliders}; mentions: {mentions}.\n\
Respond with JSON only: {{\"description\": string, \"addIt\": bool, \"clip_length\": int}}. \
Set addIt to true if this story belongs in a short recap video, and then set clip_length to \
the number of seconds it should play.",
            media = media,
            subject = self.subject,
            focus = focus,
            sentinel = NOTHING_INTERESTING,
            earlier = earlier,
            history = list(self.history.entries()),
            events = list(&metadata.events),
            hashtags = list(&metadata.hashtags),
            polls = list(&metadata.polls),
            locations = list(&metadata.locations),
            questions = list(&metadata.questions),
            sliders = list(&metadata.sliders),
            mentions = list(&metadata.mentions),
        )
    }
}
