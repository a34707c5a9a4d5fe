use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::IndexOptions,
    ClientSession, Collection, IndexModel,
};

use crate::{
    db::{self, Database},
    errors::AppResult,
    models::{
        domain::{QuizAttempt, UserAnswer},
        query::{AttemptQuery, LeaderboardEntry, LeaderboardQuery, LeaderboardSort, QuizStats},
    },
    repositories::cascade,
    services::pagination::PageWindow,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Stores the attempt and all of its answers, or nothing at all.
    async fn create_with_answers(
        &self,
        attempt: QuizAttempt,
        answers: Vec<UserAnswer>,
    ) -> AppResult<QuizAttempt>;
    async fn find_answers(&self, attempt_id: &str) -> AppResult<Vec<UserAnswer>>;
    async fn count(&self, query: &AttemptQuery) -> AppResult<u64>;
    /// Newest first.
    async fn list(&self, query: &AttemptQuery, window: PageWindow) -> AppResult<Vec<QuizAttempt>>;
    async fn count_distinct_quizzes(&self, query: &AttemptQuery) -> AppResult<u64>;
    async fn quiz_stats(&self, quiz_id: &str) -> AppResult<QuizStats>;
    async fn leaderboard_count(&self, query: &LeaderboardQuery) -> AppResult<u64>;
    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        window: PageWindow,
    ) -> AppResult<Vec<LeaderboardEntry>>;
}

pub struct MongoQuizAttemptRepository {
    db: Database,
    collection: Collection<QuizAttempt>,
    answers: Collection<UserAnswer>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection(db::QUIZ_ATTEMPTS),
            answers: db.get_collection(db::USER_ANSWERS),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_quiz_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_quiz".to_string())
                    .build(),
            )
            .build();

        let quiz_id_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("quiz_id".to_string())
                    .build(),
            )
            .build();

        let attempt_answers_index = IndexModel::builder()
            .keys(doc! { "attempt_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("attempt_id".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_quiz_index).await?;
        self.collection.create_index(quiz_id_index).await?;
        self.answers.create_index(attempt_answers_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }

    fn filter(query: &AttemptQuery) -> Document {
        let mut filter = doc! {};
        if let Some(quiz_id) = &query.quiz_id {
            filter.insert("quiz_id", quiz_id);
        }

        let mut user = Document::new();
        if let Some(user_id) = &query.user_id {
            user.insert("$eq", user_id);
        }
        if let Some(user_ids) = &query.user_ids {
            user.insert("$in", user_ids.clone());
        }
        if !user.is_empty() {
            filter.insert("user_id", user);
        }

        if let Some(full_score) = query.full_score {
            filter.insert("full_score", full_score);
        }
        filter
    }

    /// Members joined with their attempts on the given quizzes, reduced to a
    /// total score and a count of distinct quizzes, then filtered.
    fn leaderboard_pipeline(query: &LeaderboardQuery) -> Vec<Document> {
        let mut pipeline = vec![
            doc! { "$match": { "id": { "$in": query.member_ids.clone() } } },
            doc! {
                "$lookup": {
                    "from": db::QUIZ_ATTEMPTS,
                    "let": { "uid": "$id" },
                    "pipeline": [
                        { "$match": { "$expr": { "$and": [
                            { "$eq": ["$user_id", "$$uid"] },
                            { "$in": ["$quiz_id", query.quiz_ids.clone()] },
                        ] } } },
                    ],
                    "as": "attempts",
                }
            },
            doc! {
                "$project": {
                    "_id": 0,
                    "user_id": "$id",
                    "user_name": "$user_name",
                    "total_score": { "$toLong": { "$sum": "$attempts.score" } },
                    "attempted_quizzes": {
                        "$toLong": { "$size": { "$setUnion": ["$attempts.quiz_id", []] } }
                    },
                }
            },
        ];

        if let Some(name) = &query.name_contains {
            pipeline.push(doc! { "$match": { "user_name": cascade::contains_regex(name) } });
        }

        let mut score = Document::new();
        if let Some(min) = query.min_score {
            score.insert("$gte", min);
        }
        if let Some(max) = query.max_score {
            score.insert("$lte", max);
        }
        if !score.is_empty() {
            pipeline.push(doc! { "$match": { "total_score": score } });
        }

        pipeline
    }

    fn leaderboard_sort(sort: LeaderboardSort) -> Document {
        match sort {
            LeaderboardSort::Score => doc! { "total_score": -1, "user_name": 1, "user_id": 1 },
            LeaderboardSort::UserName => doc! { "user_name": 1, "user_id": 1 },
        }
    }

    async fn insert_within(
        &self,
        session: &mut ClientSession,
        attempt: &QuizAttempt,
        answers: &[UserAnswer],
    ) -> AppResult<()> {
        self.collection
            .insert_one(attempt)
            .session(&mut *session)
            .await?;
        if !answers.is_empty() {
            self.answers
                .insert_many(answers)
                .session(&mut *session)
                .await?;
        }
        Ok(())
    }
}

fn count_from(docs: &[Document], field: &str) -> u64 {
    match docs.first().and_then(|d| d.get(field)) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        _ => 0,
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create_with_answers(
        &self,
        attempt: QuizAttempt,
        answers: Vec<UserAnswer>,
    ) -> AppResult<QuizAttempt> {
        let mut session = self.db.begin_transaction().await?;
        let result = self.insert_within(&mut session, &attempt, &answers).await;
        Database::finish_transaction(session, result).await?;
        Ok(attempt)
    }

    async fn find_answers(&self, attempt_id: &str) -> AppResult<Vec<UserAnswer>> {
        let answers = self
            .answers
            .find(doc! { "attempt_id": attempt_id })
            .await?
            .try_collect()
            .await?;
        Ok(answers)
    }

    async fn count(&self, query: &AttemptQuery) -> AppResult<u64> {
        let total = self.collection.count_documents(Self::filter(query)).await?;
        Ok(total)
    }

    async fn list(&self, query: &AttemptQuery, window: PageWindow) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(Self::filter(query))
            .sort(doc! { "created_at": -1, "id": 1 })
            .skip(window.offset)
            .limit(window.limit)
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn count_distinct_quizzes(&self, query: &AttemptQuery) -> AppResult<u64> {
        let quiz_ids = self
            .collection
            .distinct("quiz_id", Self::filter(query))
            .await?;
        Ok(quiz_ids.len() as u64)
    }

    async fn quiz_stats(&self, quiz_id: &str) -> AppResult<QuizStats> {
        let pipeline = vec![
            doc! { "$match": { "quiz_id": quiz_id } },
            doc! {
                "$group": {
                    "_id": Bson::Null,
                    "max_score": { "$max": "$score" },
                    "min_score": { "$min": "$score" },
                    "average_score": { "$avg": "$score" },
                    "users": { "$addToSet": "$user_id" },
                }
            },
            doc! { "$project": { "_id": 0, "max_score": 1, "min_score": 1, "average_score": 1,
                "attempts": { "$size": "$users" } } },
        ];

        let docs: Vec<Document> = self
            .collection
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        let Some(row) = docs.first() else {
            return Ok(QuizStats::empty());
        };
        Ok(QuizStats {
            max_score: row.get_i32("max_score").ok(),
            min_score: row.get_i32("min_score").ok(),
            average_score: row.get_f64("average_score").ok(),
            attempts: count_from(&docs, "attempts"),
        })
    }

    async fn leaderboard_count(&self, query: &LeaderboardQuery) -> AppResult<u64> {
        if query.member_ids.is_empty() {
            return Ok(0);
        }
        let mut pipeline = Self::leaderboard_pipeline(query);
        pipeline.push(doc! { "$count": "total" });

        let docs: Vec<Document> = self
            .db
            .get_collection::<Document>(db::USERS)
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;
        Ok(count_from(&docs, "total"))
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        window: PageWindow,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        if query.member_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipeline = Self::leaderboard_pipeline(query);
        pipeline.push(doc! { "$sort": Self::leaderboard_sort(query.sort) });
        pipeline.push(doc! { "$skip": window.offset as i64 });
        pipeline.push(doc! { "$limit": window.limit });

        let docs: Vec<Document> = self
            .db
            .get_collection::<Document>(db::USERS)
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        let entries = docs
            .into_iter()
            .map(bson::from_document::<LeaderboardEntry>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_filter_combines_user_constraints() {
        let query = AttemptQuery {
            quiz_id: Some("quiz-1".to_string()),
            user_id: Some("u-1".to_string()),
            user_ids: Some(vec!["u-1".to_string(), "u-2".to_string()]),
            full_score: Some(true),
        };
        let filter = MongoQuizAttemptRepository::filter(&query);
        let user = filter.get_document("user_id").unwrap();

        assert_eq!(user.get_str("$eq").unwrap(), "u-1");
        assert_eq!(user.get_array("$in").unwrap().len(), 2);
        assert!(filter.get_bool("full_score").unwrap());
    }

    #[test]
    fn test_leaderboard_pipeline_adds_score_bounds_only_when_set() {
        let base = LeaderboardQuery {
            member_ids: vec!["u-1".to_string()],
            quiz_ids: vec!["quiz-1".to_string()],
            ..Default::default()
        };
        assert_eq!(MongoQuizAttemptRepository::leaderboard_pipeline(&base).len(), 3);

        let bounded = LeaderboardQuery {
            name_contains: Some("ann".to_string()),
            min_score: Some(3),
            ..base
        };
        let pipeline = MongoQuizAttemptRepository::leaderboard_pipeline(&bounded);
        assert_eq!(pipeline.len(), 5);

        let score = pipeline[4]
            .get_document("$match")
            .and_then(|m| m.get_document("total_score"))
            .unwrap();
        assert_eq!(score.get_i64("$gte").unwrap(), 3);
        assert!(score.get("$lte").is_none());
    }

    #[test]
    fn test_count_from_reads_either_integer_width() {
        assert_eq!(count_from(&[doc! { "total": 4_i32 }], "total"), 4);
        assert_eq!(count_from(&[doc! { "total": 9_i64 }], "total"), 9);
        assert_eq!(count_from(&[], "total"), 0);
    }
}
