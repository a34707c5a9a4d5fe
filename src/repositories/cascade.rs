//! Multi-collection deletes shared by the Mongo adapters. Every helper runs on
//! the caller's session so the whole cascade commits or aborts as one.

use mongodb::{
    bson::{doc, Bson, Document},
    ClientSession, Collection,
};

use crate::{
    db::{self, Database},
    errors::AppResult,
};

pub(crate) async fn distinct_ids(
    collection: &Collection<Document>,
    filter: Document,
    session: &mut ClientSession,
) -> AppResult<Vec<String>> {
    let values = collection.distinct("id", filter).session(&mut *session).await?;
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Bson::String(id) => Some(id),
            _ => None,
        })
        .collect())
}

/// Deletes matching attempts and their answers.
pub(crate) async fn delete_attempts(
    db: &Database,
    session: &mut ClientSession,
    filter: Document,
) -> AppResult<()> {
    let attempts = db.get_collection::<Document>(db::QUIZ_ATTEMPTS);
    let attempt_ids = distinct_ids(&attempts, filter, session).await?;
    if attempt_ids.is_empty() {
        return Ok(());
    }

    db.get_collection::<Document>(db::USER_ANSWERS)
        .delete_many(doc! { "attempt_id": { "$in": attempt_ids.clone() } })
        .session(&mut *session)
        .await?;
    attempts
        .delete_many(doc! { "id": { "$in": attempt_ids } })
        .session(&mut *session)
        .await?;
    Ok(())
}

/// Deletes matching quizzes with their questions, attempts and answers.
pub(crate) async fn delete_quizzes(
    db: &Database,
    session: &mut ClientSession,
    filter: Document,
) -> AppResult<()> {
    let quizzes = db.get_collection::<Document>(db::QUIZZES);
    let quiz_ids = distinct_ids(&quizzes, filter, session).await?;
    if quiz_ids.is_empty() {
        return Ok(());
    }

    delete_attempts(db, session, doc! { "quiz_id": { "$in": quiz_ids.clone() } }).await?;
    db.get_collection::<Document>(db::QUESTIONS)
        .delete_many(doc! { "quiz_id": { "$in": quiz_ids.clone() } })
        .session(&mut *session)
        .await?;
    quizzes
        .delete_many(doc! { "id": { "$in": quiz_ids } })
        .session(&mut *session)
        .await?;
    Ok(())
}

/// Deletes matching groups and every quiz attached to them.
pub(crate) async fn delete_groups(
    db: &Database,
    session: &mut ClientSession,
    filter: Document,
) -> AppResult<()> {
    let groups = db.get_collection::<Document>(db::GROUPS);
    let group_ids = distinct_ids(&groups, filter, session).await?;
    if group_ids.is_empty() {
        return Ok(());
    }

    delete_quizzes(db, session, doc! { "group_id": { "$in": group_ids.clone() } }).await?;
    groups
        .delete_many(doc! { "id": { "$in": group_ids } })
        .session(&mut *session)
        .await?;
    Ok(())
}

pub(crate) fn contains_regex(needle: &str) -> Document {
    doc! { "$regex": regex::escape(needle), "$options": "i" }
}
