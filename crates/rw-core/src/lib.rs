//! rusty-writers/crates/rw-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Writers:
//! the whole-blob document store, its repository services and the ports
//! that plugins implement.

pub mod critic;
pub mod error;
pub mod feed;
pub mod memory;
pub mod models;
pub mod services;
pub mod store;
pub mod traits;

// Re-exporting for easier access in other crates
pub use critic::{CriticError, CriticResponse, CritiqueRequest, DiscussionPost, OfflineCritic};
pub use error::*;
pub use feed::{parse_tags, StoryQuery, StorySort};
pub use memory::MemoryPersistence;
pub use models::*;
pub use services::{StoryService, UserService};
pub use store::DocumentStore;
pub use traits::*;
