use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    ClientSession, Collection, IndexModel,
};

use crate::{
    db::{self, Database},
    errors::{AppError, AppResult},
    models::{domain::Group, query::GroupQuery},
    repositories::cascade,
    services::pagination::PageWindow,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn create(&self, group: Group) -> AppResult<Group>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Group>>;
    async fn find_by_title(&self, title: &str) -> AppResult<Option<Group>>;
    async fn rename(&self, id: &str, title: &str) -> AppResult<()>;
    async fn count(&self, query: &GroupQuery) -> AppResult<u64>;
    async fn list(&self, query: &GroupQuery, window: PageWindow) -> AppResult<Vec<Group>>;
    /// Adds all `user_ids` in one write.
    async fn add_members(&self, id: &str, user_ids: &[String]) -> AppResult<()>;
    /// Removes all `user_ids` in one write.
    async fn remove_members(&self, id: &str, user_ids: &[String]) -> AppResult<()>;
    /// Removes the group and its quizzes with everything attached to them.
    async fn delete_cascade(&self, id: &str) -> AppResult<()>;
}

pub struct MongoGroupRepository {
    db: Database,
    collection: Collection<Group>,
}

impl MongoGroupRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(db::GROUPS);
        Self {
            db: db.clone(),
            collection,
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for groups collection");

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

        let member_index = IndexModel::builder()
            .keys(doc! { "member_ids": 1 })
            .options(
                IndexOptions::builder()
                    .name("member_ids".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(title_index).await?;
        self.collection.create_index(member_index).await?;

        log::info!("Successfully created indexes for groups collection");
        Ok(())
    }

    fn filter(query: &GroupQuery) -> Document {
        let mut filter = doc! {};
        if let Some(title) = &query.title_contains {
            filter.insert("title", cascade::contains_regex(title));
        }
        if let Some(owner_id) = &query.owner_id {
            filter.insert("owner_id", owner_id);
        }
        if let Some(member_id) = &query.member_id {
            filter.insert("member_ids", member_id);
        }
        filter
    }

    fn not_found(id: &str) -> AppError {
        AppError::NotFound(format!("Group '{}' not found", id))
    }

    async fn delete_within(&self, session: &mut ClientSession, id: &str) -> AppResult<()> {
        let exists = self
            .collection
            .find_one(doc! { "id": id })
            .session(&mut *session)
            .await?
            .is_some();
        if !exists {
            return Err(Self::not_found(id));
        }
        cascade::delete_groups(&self.db, session, doc! { "id": id }).await
    }
}

#[async_trait]
impl GroupRepository for MongoGroupRepository {
    async fn create(&self, group: Group) -> AppResult<Group> {
        self.collection.insert_one(&group).await?;
        Ok(group)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Group>> {
        let group = self.collection.find_one(doc! { "id": id }).await?;
        Ok(group)
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Group>> {
        let group = self.collection.find_one(doc! { "title": title }).await?;
        Ok(group)
    }

    async fn rename(&self, id: &str, title: &str) -> AppResult<()> {
        let result = self
            .collection
            .update_one(doc! { "id": id }, doc! { "$set": { "title": title } })
            .await?;
        if result.matched_count == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn count(&self, query: &GroupQuery) -> AppResult<u64> {
        let total = self.collection.count_documents(Self::filter(query)).await?;
        Ok(total)
    }

    async fn list(&self, query: &GroupQuery, window: PageWindow) -> AppResult<Vec<Group>> {
        let groups = self
            .collection
            .find(Self::filter(query))
            .sort(doc! { "title": 1, "id": 1 })
            .skip(window.offset)
            .limit(window.limit)
            .await?
            .try_collect()
            .await?;
        Ok(groups)
    }

    async fn add_members(&self, id: &str, user_ids: &[String]) -> AppResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id },
                doc! { "$addToSet": { "member_ids": { "$each": user_ids.to_vec() } } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn remove_members(&self, id: &str, user_ids: &[String]) -> AppResult<()> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id },
                doc! { "$pullAll": { "member_ids": user_ids.to_vec() } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let mut session = self.db.begin_transaction().await?;
        let result = self.delete_within(&mut session, id).await;
        Database::finish_transaction(session, result).await?;

        log::info!("Deleted group {} with its quizzes", id);
        Ok(())
    }
}
