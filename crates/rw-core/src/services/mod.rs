//! # Services
//!
//! Repository functions over the [`DocumentStore`](crate::store::DocumentStore).
//! Each call hydrates, performs one logical query or mutation, flushes and
//! returns projected data only.

pub mod stories;
pub mod users;

pub use stories::StoryService;
pub use users::UserService;
