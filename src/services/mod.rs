pub mod group_service;
pub mod pagination;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod user_service;

pub use group_service::GroupService;
pub use pagination::{Page, PageRequest, Paginator};
pub use quiz_attempt_service::QuizAttemptService;
pub use quiz_service::QuizService;
pub use user_service::UserService;
