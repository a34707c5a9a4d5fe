pub mod group;
pub mod question;
pub mod quiz;
pub mod quiz_attempt;
pub mod user;
pub use group::Group;
pub use question::{AnswerOption, Question, QuestionType};
pub use quiz::Quiz;
pub use quiz_attempt::{QuizAttempt, UserAnswer};
pub use user::User;
