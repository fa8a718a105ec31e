//! Data models
//!
//! This module contains the data structures used throughout Blogicum:
//! - Database entities (User, Session, Category, Location, Post, Comment)
//! - Form inputs and joined views used by services and templates
//! - Pagination parameters and results

mod category;
mod comment;
mod location;
mod pagination;
mod post;
mod session;
mod user;

pub use category::{Category, CategorySummary, CreateCategoryInput};
pub use comment::{Comment, CommentForm, CommentWithAuthor};
pub use location::{CreateLocationInput, Location, LocationSummary};
pub use pagination::{ListParams, PageInfo, PagedResult, POSTS_PER_PAGE};
pub use post::{
    AuthorSummary, ImageChange, Post, PostFields, PostForm, PostWithMeta, PUB_DATE_FORMAT,
};
pub use session::Session;
pub use user::{ProfileInput, RegisterInput, User, UserRole};
