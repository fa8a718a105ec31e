//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - visibility rules and paginated feeds
//! - ownership checks on post and comment mutations
//! - authentication and moderation

pub mod admin;
pub mod comment;
pub mod error;
pub mod feed;
pub mod password;
pub mod post;
pub mod user;
pub mod visibility;

pub use admin::{find_model, AdminListRequest, AdminModel, AdminService, ADMIN_MODELS, ADMIN_PAGE_SIZE};
pub use comment::CommentService;
pub use error::{FieldErrors, ServiceError, ServiceResult, UpdateOutcome};
pub use feed::{CategoryFeed, FeedService, PostDetail, ProfileFeed};
pub use password::{hash_password, verify_password};
pub use post::{ImageUpload, PostFormChoices, PostService};
pub use user::{LoginInput, UserService, UserServiceError};
pub use visibility::{is_comment_visible, is_post_visible, is_publicly_visible};
