use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

/// Derived reading of an entry. Replaced wholesale on re-analysis, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub sentiment: Sentiment,
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<Analysis>,
}

impl DiaryEntry {
    /// Builds a fresh entry from user input; id and timestamps are assigned here.
    pub fn new(draft: EntryDraft) -> Self {
        let now = Utc::now();
        DiaryEntry {
            id: Uuid::new_v4(),
            title: normalize_title(&draft.title),
            content: draft.content,
            mood: normalize_mood(draft.mood.as_deref()),
            tags: normalize_tags(draft.tags),
            created_at: now,
            updated_at: now,
            ai_analysis: None,
        }
    }

    /// Merges the set fields of `patch` and refreshes `updated_at`.
    pub fn apply(&mut self, patch: EntryPatch) {
        if let Some(title) = patch.title {
            self.title = normalize_title(&title);
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(mood) = patch.mood {
            self.mood = normalize_mood(mood.as_deref());
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        self.touch();
    }

    pub fn attach_analysis(&mut self, analysis: Analysis) {
        self.ai_analysis = Some(analysis);
        self.touch();
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.ai_analysis.as_ref().map(|a| a.sentiment)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }
}

/// User-supplied fields for a new entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
    pub mood: Option<String>,
    pub tags: Vec<String>,
}

impl EntryDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        EntryDraft {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update; `None` leaves a field untouched. `mood: Some(None)` clears the mood.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_mood(mood: Option<&str>) -> Option<String> {
    mood.map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parses the comma-separated tag field the UI collects.
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(',').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_defaults_blank_title_and_mood() {
        let entry = DiaryEntry::new(EntryDraft::new("   ", "hi").with_mood(" "));
        assert_eq!(entry.title, DEFAULT_TITLE);
        assert_eq!(entry.mood, None);
        assert_eq!(entry.created_at, entry.updated_at);
        assert!(entry.ai_analysis.is_none());
    }

    #[test]
    fn tags_keep_order_and_drop_blanks() {
        let entry = DiaryEntry::new(EntryDraft::new("t", "c").with_tags(["work", " ", " gratitude "]));
        assert_eq!(entry.tags, vec!["work", "gratitude"]);
        assert_eq!(parse_tags("a, b,,c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut entry = DiaryEntry::new(EntryDraft::new("Title", "body").with_mood("calm"));
        entry.apply(EntryPatch {
            content: Some("new body".into()),
            ..Default::default()
        });
        assert_eq!(entry.title, "Title");
        assert_eq!(entry.content, "new body");
        assert_eq!(entry.mood.as_deref(), Some("calm"));
        assert!(entry.updated_at >= entry.created_at);

        entry.apply(EntryPatch {
            mood: Some(None),
            ..Default::default()
        });
        assert_eq!(entry.mood, None);
    }

    #[test]
    fn deserializes_with_absent_optional_fields() {
        let json = r#"{
            "id": "6f1c1b3e-8f5e-4a8a-9a51-2b0f7d4f9c11",
            "title": "A Great Day at Work",
            "content": "Today was wonderful!",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        }"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert!(entry.tags.is_empty());
        assert_eq!(entry.mood, None);
        assert!(entry.ai_analysis.is_none());
    }

    #[test]
    fn serializes_camel_case_fields() {
        let mut entry = DiaryEntry::new(EntryDraft::new("t", "c"));
        entry.attach_analysis(Analysis {
            sentiment: Sentiment::Mixed,
            summary: "c".into(),
            insights: vec!["i".into()],
            recommendations: vec!["r".into()],
            generated_at: Utc::now(),
        });
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("createdAt").is_some());
        assert_eq!(value["aiAnalysis"]["sentiment"], "mixed");
        assert!(value["aiAnalysis"].get("generatedAt").is_some());
    }
}
