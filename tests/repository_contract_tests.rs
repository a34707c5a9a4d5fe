//! Behaviour every repository implementation must share. The checks take
//! trait objects so they can run against any adapter.

mod common;

use common::InMemoryStore;
use quickie_server::{
    models::{
        domain::{Group, Quiz, User},
        query::{GroupQuery, GroupScope, QuizQuery, QuizSortKey, UserQuery},
    },
    repositories::{GroupRepository, QuizRepository, UserRepository},
    services::pagination::PageWindow,
};

fn window(offset: u64, limit: i64) -> PageWindow {
    PageWindow { offset, limit }
}

async fn check_quiz_scopes(repo: &dyn QuizRepository) {
    let mut grouped = Quiz::new("author", "Grouped", "misc", 1, 1);
    grouped.group_id = Some("g-1".to_string());
    repo.create(grouped.clone()).await.unwrap();
    repo.create(Quiz::new("author", "Loose", "misc", 1, 1))
        .await
        .unwrap();
    repo.create(Quiz::new("other", "Elsewhere", "misc", 1, 1))
        .await
        .unwrap();

    let ungrouped = QuizQuery {
        scope: GroupScope::Ungrouped,
        ..Default::default()
    };
    assert_eq!(repo.count(&ungrouped).await.unwrap(), 2);

    let in_group = QuizQuery {
        scope: GroupScope::Group("g-1".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.find_ids(&in_group).await.unwrap(), vec![grouped.id]);

    let by_author = QuizQuery {
        author_id: Some("author".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.count(&by_author).await.unwrap(), 2);
}

async fn check_quiz_sort_and_window(repo: &dyn QuizRepository) {
    for (title, difficulty) in [("Cobalt", 3), ("amber", 5), ("Basalt", 1)] {
        repo.create(Quiz::new("author", title, "rocks", difficulty, 1))
            .await
            .unwrap();
    }

    let by_difficulty = QuizQuery {
        sort: QuizSortKey::Difficulty,
        ..Default::default()
    };
    let titles: Vec<String> = repo
        .list(&by_difficulty, window(0, 10))
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.title)
        .collect();
    assert_eq!(titles, vec!["Basalt", "Cobalt", "amber"]);

    let second: Vec<String> = repo
        .list(&by_difficulty, window(1, 1))
        .await
        .unwrap()
        .into_iter()
        .map(|q| q.title)
        .collect();
    assert_eq!(second, vec!["Cobalt"]);

    let search = QuizQuery {
        title_contains: Some("ALT".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.count(&search).await.unwrap(), 2);
}

async fn check_user_search(repo: &dyn UserRepository) {
    for name in ["marta", "martin", "olga"] {
        repo.create(User::new(name, &format!("{}@example.com", name)))
            .await
            .unwrap();
    }

    let query = UserQuery {
        name_contains: Some("MART".to_string()),
    };
    assert_eq!(repo.count(&query).await.unwrap(), 2);
    let names: Vec<String> = repo
        .list(&query, window(0, 10))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.user_name)
        .collect();
    assert_eq!(names, vec!["marta", "martin"]);

    let missing = repo.find_by_ids(&["nobody".to_string()]).await.unwrap();
    assert!(missing.is_empty());
}

async fn check_group_membership(repo: &dyn GroupRepository) {
    let group = repo.create(Group::new("Readers", "owner")).await.unwrap();
    repo.add_members(&group.id, &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    repo.remove_members(&group.id, &["a".to_string()])
        .await
        .unwrap();

    let stored = repo.find_by_id(&group.id).await.unwrap().unwrap();
    assert_eq!(stored.member_ids, vec!["b".to_string()]);

    let subscribed = GroupQuery {
        member_id: Some("b".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.count(&subscribed).await.unwrap(), 1);

    repo.rename(&group.id, "Writers").await.unwrap();
    assert!(repo.find_by_title("Writers").await.unwrap().is_some());
}

#[tokio::test]
async fn test_in_memory_quiz_scopes() {
    let store = InMemoryStore::new();
    check_quiz_scopes(&*store).await;
}

#[tokio::test]
async fn test_in_memory_quiz_sort_and_window() {
    let store = InMemoryStore::new();
    check_quiz_sort_and_window(&*store).await;
}

#[tokio::test]
async fn test_in_memory_user_search() {
    let store = InMemoryStore::new();
    check_user_search(&*store).await;
}

#[tokio::test]
async fn test_in_memory_group_membership() {
    let store = InMemoryStore::new();
    check_group_membership(&*store).await;
}
