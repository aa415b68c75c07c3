//! Story feed filtering and ordering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::StoryView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorySort {
    /// Newest first.
    #[default]
    Date,
    /// Highest AI score first; unrated stories count as zero.
    Rating,
    /// Most liked first.
    Likes,
    /// Rated stories by score, then unrated ones by date.
    Featured,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryQuery {
    /// Whitespace-separated terms; a story matches if any term does.
    #[serde(default, rename = "q")]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: StorySort,
}

impl StoryQuery {
    pub fn apply(&self, stories: Vec<StoryView>) -> Vec<StoryView> {
        let terms: Vec<String> = self
            .search
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let mut result: Vec<StoryView> = stories
            .into_iter()
            .filter(|s| terms.is_empty() || terms.iter().any(|t| matches_term(s, t)))
            .collect();

        // sort_by is stable: ties keep storage order
        match self.sort {
            StorySort::Date => result.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            StorySort::Rating => result.sort_by(|a, b| score(b).total_cmp(&score(a))),
            StorySort::Likes => result.sort_by(|a, b| b.likes.cmp(&a.likes)),
            StorySort::Featured => result.sort_by(featured),
        }
        result
    }
}

fn score(story: &StoryView) -> f64 {
    story.ai_rating.as_ref().map_or(0.0, |r| r.overall_score)
}

fn featured(a: &StoryView, b: &StoryView) -> Ordering {
    match (&a.ai_rating, &b.ai_rating) {
        (Some(ra), Some(rb)) => rb.overall_score.total_cmp(&ra.overall_score),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    }
}

fn matches_term(story: &StoryView, term: &str) -> bool {
    let hit = |text: &str| text.to_lowercase().contains(term);
    hit(story.title.as_str())
        || hit(story.content.as_str())
        || story.genre.as_deref().is_some_and(hit)
        || story
            .tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| hit(t.as_str())))
}

/// Splits a comma-separated tag field. Returns `None` when no tag remains.
pub fn parse_tags(raw: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}
