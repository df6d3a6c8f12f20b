//! Data models
//!
//! This module contains all data structures used throughout the Gazette
//! publishing service. Models represent:
//! - Database entities (Post, Category, Comment, User, Author, Group, Session)
//! - API request/response types
//! - Internal data transfer objects

mod author;
mod category;
mod comment;
mod group;
mod post;
mod session;
mod subscription;
mod user;

pub use author::Author;
pub use category::{Category, CategoryWithPosts, CreateCategoryInput};
pub use comment::{Comment, CommentWithAuthor, CreateCommentInput};
pub use group::{Group, AUTHORS_GROUP, COMMON_GROUP};
pub use post::{
    CreatePostInput, ListParams, PagedResult, Post, PostSearch, PostType, PostWithAuthor,
    UpdatePostInput,
};
pub use session::Session;
pub use subscription::CategorySubscription;
pub use user::{CreateUserInput, UpdateProfileInput, User};
