use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    options::IndexOptions,
    ClientSession, Collection, IndexModel,
};

use crate::{
    db::{self, Database},
    errors::{AppError, AppResult},
    models::{
        domain::Quiz,
        query::{GroupScope, QuizQuery},
    },
    repositories::cascade,
    services::pagination::PageWindow,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>>;
    async fn update(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn count(&self, query: &QuizQuery) -> AppResult<u64>;
    async fn list(&self, query: &QuizQuery, window: PageWindow) -> AppResult<Vec<Quiz>>;
    async fn find_ids(&self, query: &QuizQuery) -> AppResult<Vec<String>>;
    /// Removes the quiz with its questions, attempts and answers. Atomic.
    async fn delete_cascade(&self, id: &str) -> AppResult<()>;
}

pub struct MongoQuizRepository {
    db: Database,
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(db::QUIZZES);
        Self {
            db: db.clone(),
            collection,
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let title_index = IndexModel::builder()
            .keys(doc! { "title": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("title_unique".to_string())
                    .build(),
            )
            .build();

        let group_index = IndexModel::builder()
            .keys(doc! { "group_id": 1 })
            .options(IndexOptions::builder().name("group_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(title_index).await?;
        self.collection.create_index(group_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }

    fn filter(query: &QuizQuery) -> Document {
        let mut filter = doc! {};
        if let Some(author_id) = &query.author_id {
            filter.insert("user_id", author_id);
        }
        match &query.scope {
            GroupScope::Any => {}
            GroupScope::Ungrouped => {
                filter.insert("group_id", Bson::Null);
            }
            GroupScope::Group(group_id) => {
                filter.insert("group_id", group_id);
            }
        }
        if let Some(title) = &query.title_contains {
            filter.insert("title", cascade::contains_regex(title));
        }
        if let Some(category) = &query.category {
            filter.insert("category", category);
        }
        if let Some(difficulty) = query.difficulty {
            filter.insert("difficulty", difficulty);
        }
        filter
    }

    fn sort(query: &QuizQuery) -> Document {
        let mut sort = Document::new();
        sort.insert(query.sort.field(), 1);
        sort.insert("id", 1);
        sort
    }

    async fn delete_within(&self, session: &mut ClientSession, id: &str) -> AppResult<()> {
        let exists = self
            .collection
            .find_one(doc! { "id": id })
            .session(&mut *session)
            .await?
            .is_some();
        if !exists {
            return Err(AppError::NotFound(format!("Quiz '{}' not found", id)));
        }
        cascade::delete_quizzes(&self.db, session, doc! { "id": id }).await
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "title": title }).await?;
        Ok(quiz)
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        let result = self
            .collection
            .replace_one(doc! { "id": &quiz.id }, &quiz)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Quiz '{}' not found", quiz.id)));
        }
        Ok(quiz)
    }

    async fn count(&self, query: &QuizQuery) -> AppResult<u64> {
        let total = self.collection.count_documents(Self::filter(query)).await?;
        Ok(total)
    }

    async fn list(&self, query: &QuizQuery, window: PageWindow) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(Self::filter(query))
            .sort(Self::sort(query))
            .skip(window.offset)
            .limit(window.limit)
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn find_ids(&self, query: &QuizQuery) -> AppResult<Vec<String>> {
        let ids = self
            .collection
            .distinct("id", Self::filter(query))
            .await?
            .into_iter()
            .filter_map(|value| match value {
                Bson::String(id) => Some(id),
                _ => None,
            })
            .collect();
        Ok(ids)
    }

    async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let mut session = self.db.begin_transaction().await?;
        let result = self.delete_within(&mut session, id).await;
        Database::finish_transaction(session, result).await?;

        log::info!("Deleted quiz {} with its questions and attempts", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::query::QuizSortKey;

    #[test]
    fn test_ungrouped_scope_matches_null_group() {
        let query = QuizQuery {
            scope: GroupScope::Ungrouped,
            difficulty: Some(2),
            ..Default::default()
        };
        let filter = MongoQuizRepository::filter(&query);

        assert_eq!(filter.get("group_id"), Some(&Bson::Null));
        assert_eq!(filter.get_i32("difficulty").unwrap(), 2);
        assert!(filter.get("user_id").is_none());
    }

    #[test]
    fn test_sort_uses_key_then_id() {
        let query = QuizQuery {
            sort: QuizSortKey::Start,
            ..Default::default()
        };
        let sort = MongoQuizRepository::sort(&query);
        let keys: Vec<&String> = sort.keys().collect();

        assert_eq!(keys, vec!["start", "id"]);
    }
}
