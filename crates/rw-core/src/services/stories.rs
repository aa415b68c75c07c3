//! Stories, comments and likes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::critic::{self, CriticResponse, CritiqueRequest};
use crate::error::{AppError, Result};
use crate::feed::StoryQuery;
use crate::models::{
    Attachment, Comment, CommentView, EntityKind, NewComment, NewStory, PublicUser, Snapshot,
    Story, StoryView, User,
};
use crate::store::DocumentStore;
use crate::traits::StoryCritic;

pub const DEFAULT_CRITIC_TIMEOUT: Duration = Duration::from_secs(60);

/// Synthetic account the critic's comments and discussion posts belong to.
pub const AI_USERNAME: &str = "AIAssistant";
pub(crate) const AI_EMAIL: &str = "ai@aiwriters.app";
/// Not a valid hash for any hasher, so the account can never log in.
const AI_PASSWORD_HASH: &str = "no_password";
const AI_AVATAR: &str = "https://i.imgur.com/ci8VOO9.jpeg";
const AI_BIO: &str = "An artificial intelligence that helps evaluate stories";

pub struct StoryService {
    store: Arc<DocumentStore>,
    critic: Arc<dyn StoryCritic>,
    critic_timeout: Duration,
}

impl StoryService {
    pub fn new(store: Arc<DocumentStore>, critic: Arc<dyn StoryCritic>) -> Self {
        Self {
            store,
            critic,
            critic_timeout: DEFAULT_CRITIC_TIMEOUT,
        }
    }

    pub fn with_critic_timeout(mut self, timeout: Duration) -> Self {
        self.critic_timeout = timeout;
        self
    }

    /// Publishes a story with its AI review.
    ///
    /// The critic is consulted before the store is locked. Its rating is
    /// attached to the story; its comment (if any) becomes an AI comment and
    /// its discussion post (if any) a separate story by the AI account. All
    /// of it lands in one flush. A failing critic yields the fallback rating.
    pub async fn create_story(&self, new: NewStory) -> Result<StoryView> {
        if new.title.trim().is_empty() {
            return Err(AppError::validation("title is required"));
        }
        if new.content.trim().is_empty() {
            return Err(AppError::validation("content is required"));
        }

        let request = CritiqueRequest {
            title: new.title.clone(),
            genre: new.genre.clone(),
            content: new.content.clone(),
        };
        let CriticResponse {
            rating,
            comment,
            ai_post,
        } = critic::assess(self.critic.as_ref(), &request, self.critic_timeout).await;
        let comment = comment.filter(|c| !c.trim().is_empty());

        let view = self
            .store
            .mutate(move |db| {
                let now = Utc::now();
                let story_id = db.next_id(EntityKind::Story);
                let attachments = new.attachments.map(|list| {
                    list.into_iter()
                        .map(|a| Attachment {
                            story_id: story_id.clone(),
                            ..a
                        })
                        .collect()
                });
                let mut story = Story {
                    id: story_id,
                    title: new.title,
                    content: new.content,
                    author_id: new.author_id,
                    likes: 0,
                    comments: Vec::new(),
                    ai_rating: rating,
                    created_at: now,
                    updated_at: now,
                    genre: new.genre,
                    tags: new.tags,
                    reposts: None,
                    attachments,
                    views: None,
                };

                let ai_user_id =
                    (comment.is_some() || ai_post.is_some()).then(|| ensure_ai_user(db));

                if let (Some(text), Some(ai_id)) = (comment, ai_user_id.as_ref()) {
                    let ai_comment = Comment {
                        id: db.next_id(EntityKind::Comment),
                        content: text,
                        author_id: ai_id.clone(),
                        story_id: story.id.clone(),
                        is_ai: true,
                        created_at: now,
                    };
                    story.comments.push(ai_comment.clone());
                    db.comments.push(ai_comment);
                }

                let discussion = match (ai_post, ai_user_id) {
                    (Some(post), Some(ai_id)) => Some(Story {
                        id: db.next_id(EntityKind::Story),
                        title: post.title,
                        content: post.content,
                        author_id: ai_id,
                        likes: 0,
                        comments: Vec::new(),
                        ai_rating: None,
                        created_at: now,
                        updated_at: now,
                        genre: None,
                        tags: None,
                        reposts: None,
                        attachments: None,
                        views: None,
                    }),
                    _ => None,
                };

                let view = StoryView::join(&story, db);
                db.stories.push(story);
                if let Some(discussion) = discussion {
                    log::info!("critic opened discussion {}", discussion.id);
                    db.stories.push(discussion);
                }
                Ok(view)
            })
            .await?;

        log::info!(
            "created story {} by {} (score {:?})",
            view.id,
            view.author_id,
            view.ai_rating.as_ref().map(|r| r.overall_score)
        );
        Ok(view)
    }

    /// Appends a user comment. `Ok(None)` when the story does not exist.
    pub async fn add_comment(
        &self,
        story_id: &str,
        new: NewComment,
    ) -> Result<Option<CommentView>> {
        if new.content.trim().is_empty() {
            return Err(AppError::validation("comment content is required"));
        }

        let added = self
            .store
            .mutate_found(|db| {
                let Some(index) = db.stories.iter().position(|s| s.id == story_id) else {
                    return Ok(None);
                };
                let comment = Comment {
                    id: db.next_id(EntityKind::Comment),
                    content: new.content,
                    author_id: new.author_id,
                    story_id: story_id.to_string(),
                    is_ai: false,
                    created_at: Utc::now(),
                };
                db.stories[index].comments.push(comment.clone());
                db.comments.push(comment.clone());
                Ok(Some(CommentView::join(&comment, db)))
            })
            .await?;

        match &added {
            Some(view) => log::info!("comment {} added to {}", view.comment.id, story_id),
            None => log::debug!("comment rejected: story {} not found", story_id),
        }
        Ok(added)
    }

    /// Adds one like. Repeated calls keep incrementing.
    pub async fn like_story(&self, story_id: &str) -> Result<Option<StoryView>> {
        self.store
            .mutate_found(|db| {
                let Some(story) = db.stories.iter_mut().find(|s| s.id == story_id) else {
                    return Ok(None);
                };
                story.likes = story.likes.saturating_add(1);
                let story = story.clone();
                Ok(Some(StoryView::join(&story, db)))
            })
            .await
    }

    pub async fn list_stories(&self) -> Result<Vec<StoryView>> {
        self.store.read(all_views).await
    }

    pub async fn get_story(&self, story_id: &str) -> Result<Option<StoryView>> {
        self.store
            .read(|db| db.find_story(story_id).map(|s| StoryView::join(s, db)))
            .await
    }

    pub async fn list_user_stories(&self, author_id: &str) -> Result<Vec<StoryView>> {
        self.store
            .read(|db| {
                db.stories
                    .iter()
                    .filter(|s| s.author_id == author_id)
                    .map(|s| StoryView::join(s, db))
                    .collect()
            })
            .await
    }

    /// Filtered and sorted listing.
    pub async fn feed(&self, query: &StoryQuery) -> Result<Vec<StoryView>> {
        let stories = self.store.read(all_views).await?;
        Ok(query.apply(stories))
    }

    /// The critic's account, if it has been created yet.
    pub async fn ai_user(&self) -> Result<Option<PublicUser>> {
        self.store
            .read(|db| find_ai_user(db).map(PublicUser::from))
            .await
    }

    pub async fn get_or_create_ai_user(&self) -> Result<PublicUser> {
        if let Some(user) = self.ai_user().await? {
            return Ok(user);
        }

        self.store
            .mutate(|db| {
                let id = ensure_ai_user(db);
                db.author_of(&id)
                    .ok_or_else(|| AppError::Internal("AI user vanished after creation".into()))
            })
            .await
    }
}

fn all_views(db: &Snapshot) -> Vec<StoryView> {
    db.stories.iter().map(|s| StoryView::join(s, db)).collect()
}

fn find_ai_user(db: &Snapshot) -> Option<&User> {
    db.users.iter().find(|u| u.is_ai)
}

/// Id of the AI account, creating it on first use.
fn ensure_ai_user(db: &mut Snapshot) -> String {
    if let Some(user) = find_ai_user(db) {
        return user.id.clone();
    }
    let user = User {
        id: db.next_id(EntityKind::User),
        username: AI_USERNAME.to_string(),
        email: AI_EMAIL.to_string(),
        password_hash: AI_PASSWORD_HASH.to_string(),
        avatar: Some(AI_AVATAR.to_string()),
        bio: Some(AI_BIO.to_string()),
        created_at: Utc::now(),
        updated_at: None,
        is_ai: true,
    };
    let id = user.id.clone();
    log::info!("created AI account {}", id);
    db.users.push(user);
    id
}
