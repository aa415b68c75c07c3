//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Writers.
//! Everything here is persisted as part of one JSON [`Snapshot`], so field
//! names are serialized in camelCase to keep the stored blob stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::feed::parse_tags;

/// Internal user record. Never leaves the store as-is: convert to
/// [`PublicUser`] at every external boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Unique across users, checked at registration time only.
    pub email: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Marks the critic's own account. Only the story service sets it.
    #[serde(default, rename = "isAI", skip_serializing_if = "std::ops::Not::not")]
    pub is_ai: bool,
}

/// The public projection of a [`User`]: everything except the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Score and critique attached once to a story by the AI critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRating {
    pub overall_score: f64,
    pub feedback: String,
    pub popularity: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub story_id: String,
}

/// A reply to a story, either from a user or from the AI critic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub story_id: String,
    #[serde(rename = "isAI")]
    pub is_ai: bool,
    pub created_at: DateTime<Utc>,
}

/// An authored work. Comments are embedded in publication order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Not enforced referentially.
    pub author_id: String,
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_rating: Option<AiRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

/// The three kinds of entity that draw identifiers from a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Story,
    Comment,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Story => "story",
            EntityKind::Comment => "comment",
        }
    }
}

/// Monotonic counters, one per [`EntityKind`]. Never decremented or reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequences {
    pub user_id: u64,
    pub story_id: u64,
    pub comment_id: u64,
}

impl Default for Sequences {
    fn default() -> Self {
        Self {
            user_id: 1,
            story_id: 1,
            comment_id: 1,
        }
    }
}

impl Sequences {
    /// Mints `"<kind>_<counter>"` and advances that counter by one.
    pub fn next(&mut self, kind: EntityKind) -> String {
        let counter = match kind {
            EntityKind::User => &mut self.user_id,
            EntityKind::Story => &mut self.story_id,
            EntityKind::Comment => &mut self.comment_id,
        };
        let id = format!("{}_{}", kind.prefix(), counter);
        *counter += 1;
        id
    }
}

/// The whole persisted document: every collection plus the sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub stories: Vec<Story>,
    pub comments: Vec<Comment>,
    pub sequences: Sequences,
}

impl Snapshot {
    pub fn next_id(&mut self, kind: EntityKind) -> String {
        self.sequences.next(kind)
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_story(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    /// Author projection for `author_id`, if such a user exists.
    pub fn author_of(&self, author_id: &str) -> Option<PublicUser> {
        self.find_user(author_id).map(PublicUser::from)
    }
}

/// A comment joined with its author's projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PublicUser>,
}

impl CommentView {
    pub fn join(comment: &Comment, snapshot: &Snapshot) -> Self {
        Self {
            comment: comment.clone(),
            author: snapshot.author_of(&comment.author_id),
        }
    }
}

/// A story joined with the projections of its author and comment authors.
/// Read model only; joins are recomputed on every call and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<PublicUser>,
    pub likes: u64,
    pub comments: Vec<CommentView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_rating: Option<AiRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

impl StoryView {
    pub fn join(story: &Story, snapshot: &Snapshot) -> Self {
        Self {
            id: story.id.clone(),
            title: story.title.clone(),
            content: story.content.clone(),
            author_id: story.author_id.clone(),
            author: snapshot.author_of(&story.author_id),
            likes: story.likes,
            comments: story
                .comments
                .iter()
                .map(|c| CommentView::join(c, snapshot))
                .collect(),
            ai_rating: story.ai_rating.clone(),
            created_at: story.created_at,
            updated_at: story.updated_at,
            genre: story.genre.clone(),
            tags: story.tags.clone(),
            reposts: story.reposts,
            attachments: story.attachments.clone(),
            views: story.views,
        }
    }
}

/// Input for story creation. Identity, counters and timestamps are assigned
/// by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStory {
    pub title: String,
    pub content: String,
    pub author_id: String,
    #[serde(default)]
    pub genre: Option<String>,
    /// Either a list or one comma-separated string.
    #[serde(default, deserialize_with = "tag_field")]
    pub tags: Option<Vec<String>>,
    /// `storyId` is replaced with the new story's id on creation.
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagField {
    List(Vec<String>),
    Csv(String),
}

fn tag_field<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags = match Option::<TagField>::deserialize(deserializer)? {
        None => None,
        Some(TagField::Csv(raw)) => parse_tags(&raw),
        Some(TagField::List(list)) => {
            let list: Vec<String> = list
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            (!list.is_empty()).then_some(list)
        }
    };
    Ok(tags)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub author_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Partial profile edit; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            avatar: None,
            bio: Some("writes at night".to_string()),
            created_at: Utc::now(),
            updated_at: None,
            is_ai: false,
        }
    }

    #[test]
    fn projection_drops_password_hash() {
        let public = PublicUser::from(&user("user_1"));
        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["id"], "user_1");
        assert_eq!(json["bio"], "writes at night");
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn ai_flag_is_omitted_for_people_and_read_back_for_the_critic() {
        let json = serde_json::to_value(user("user_1")).unwrap();
        assert!(json.get("isAI").is_none());

        let mut critic = user("user_2");
        critic.is_ai = true;
        let json = serde_json::to_value(&critic).unwrap();
        assert_eq!(json["isAI"], true);
        let back: User = serde_json::from_value(json).unwrap();
        assert!(back.is_ai);
    }

    #[test]
    fn new_story_accepts_comma_separated_tags() {
        let csv: NewStory = serde_json::from_value(serde_json::json!({
            "title": "T", "content": "C", "authorId": "user_1",
            "tags": "sci-fi, ,space opera"
        }))
        .unwrap();
        assert_eq!(
            csv.tags,
            Some(vec!["sci-fi".to_string(), "space opera".to_string()])
        );

        let list: NewStory = serde_json::from_value(serde_json::json!({
            "title": "T", "content": "C", "authorId": "user_1",
            "tags": [" noir ", ""]
        }))
        .unwrap();
        assert_eq!(list.tags, Some(vec!["noir".to_string()]));

        let none: NewStory = serde_json::from_value(serde_json::json!({
            "title": "T", "content": "C", "authorId": "user_1"
        }))
        .unwrap();
        assert_eq!(none.tags, None);
    }

    #[test]
    fn sequences_are_independent_and_monotonic() {
        let mut seq = Sequences::default();
        assert_eq!(seq.next(EntityKind::Story), "story_1");
        assert_eq!(seq.next(EntityKind::Story), "story_2");
        assert_eq!(seq.next(EntityKind::User), "user_1");
        assert_eq!(seq.next(EntityKind::Comment), "comment_1");
        assert_eq!(seq.next(EntityKind::Story), "story_3");
        assert_eq!(seq.story_id, 4);
    }

    #[test]
    fn empty_snapshot_has_stored_layout() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "users": [],
                "stories": [],
                "comments": [],
                "sequences": { "userId": 1, "storyId": 1, "commentId": 1 }
            })
        );
    }

    #[test]
    fn comment_view_flattens_with_author() {
        let mut snapshot = Snapshot::default();
        snapshot.users.push(user("user_1"));
        let comment = Comment {
            id: "comment_1".into(),
            content: "Nice pacing".into(),
            author_id: "user_1".into(),
            story_id: "story_1".into(),
            is_ai: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(CommentView::join(&comment, &snapshot)).unwrap();
        assert_eq!(json["isAI"], false);
        assert_eq!(json["author"]["username"], "ann");
        assert!(json["author"].get("passwordHash").is_none());
    }
}
