//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod admin;
pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod session;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::{
    AdminColumn, AdminListQuery, AdminRepository, AdminTable, ColumnKind, FilterValue,
    SqlxAdminRepository,
};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use location::{LocationRepository, SqlxLocationRepository};
pub use post::{PostFilter, PostRepository, SqlxPostRepository, PUBLIC_POST_PREDICATE};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
