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
    models::{domain::User, query::UserQuery},
    repositories::cascade,
    services::pagination::PageWindow,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_by_user_name(&self, user_name: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>>;
    async fn update(&self, user: User) -> AppResult<User>;
    async fn count(&self, query: &UserQuery) -> AppResult<u64>;
    async fn list(&self, query: &UserQuery, window: PageWindow) -> AppResult<Vec<User>>;
    /// Ids of every user matching `query`, unpaged.
    async fn find_ids(&self, query: &UserQuery) -> AppResult<Vec<String>>;
    /// Removes the user with their attempts, authored quizzes, owned groups
    /// and memberships. Atomic.
    async fn delete_cascade(&self, id: &str) -> AppResult<()>;
}

pub struct MongoUserRepository {
    db: Database,
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(db::USERS);
        Self {
            db: db.clone(),
            collection,
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for users collection");

        let indexes = [
            ("id", "id_unique"),
            ("user_name", "user_name_unique"),
            ("email", "email_unique"),
        ]
        .into_iter()
        .map(|(field, name)| {
            let mut keys = Document::new();
            keys.insert(field, 1);
            IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name(name.to_string())
                        .build(),
                )
                .build()
        });

        self.collection.create_indexes(indexes).await?;

        log::info!("Successfully created indexes for users collection");
        Ok(())
    }

    fn filter(query: &UserQuery) -> Document {
        let mut filter = doc! {};
        if let Some(name) = &query.name_contains {
            filter.insert("user_name", cascade::contains_regex(name));
        }
        filter
    }

    async fn delete_within(&self, session: &mut ClientSession, id: &str) -> AppResult<()> {
        let deleted = self
            .collection
            .delete_one(doc! { "id": id })
            .session(&mut *session)
            .await?;
        if deleted.deleted_count == 0 {
            return Err(AppError::NotFound(format!("User '{}' not found", id)));
        }

        cascade::delete_attempts(&self.db, session, doc! { "user_id": id }).await?;
        cascade::delete_quizzes(&self.db, session, doc! { "user_id": id }).await?;
        cascade::delete_groups(&self.db, session, doc! { "owner_id": id }).await?;
        self.db
            .get_collection::<Document>(db::GROUPS)
            .update_many(
                doc! { "member_ids": id },
                doc! { "$pull": { "member_ids": id } },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        self.collection.insert_one(&user).await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "id": id }).await?;
        Ok(user)
    }

    async fn find_by_user_name(&self, user_name: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "user_name": user_name })
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = self
            .collection
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn update(&self, user: User) -> AppResult<User> {
        let result = self
            .collection
            .replace_one(doc! { "id": &user.id }, &user)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User '{}' not found", user.id)));
        }
        Ok(user)
    }

    async fn count(&self, query: &UserQuery) -> AppResult<u64> {
        let total = self.collection.count_documents(Self::filter(query)).await?;
        Ok(total)
    }

    async fn list(&self, query: &UserQuery, window: PageWindow) -> AppResult<Vec<User>> {
        let users = self
            .collection
            .find(Self::filter(query))
            .sort(doc! { "user_name": 1, "id": 1 })
            .skip(window.offset)
            .limit(window.limit)
            .await?
            .try_collect()
            .await?;
        Ok(users)
    }

    async fn find_ids(&self, query: &UserQuery) -> AppResult<Vec<String>> {
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

        log::info!("Deleted user {} with dependent records", id);
        Ok(())
    }
}
