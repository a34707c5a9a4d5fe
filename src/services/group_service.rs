use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::Group,
        dto::{
            request::{CreateGroupRequest, LeaderboardFilter, MembersRequest, RenameGroupRequest},
            response::{GroupDto, PublicProfileDto},
        },
        query::{
            contains_ignore_case, GroupQuery, GroupScope, LeaderboardEntry, LeaderboardQuery,
            QuizQuery,
        },
    },
    repositories::{GroupRepository, QuizAttemptRepository, QuizRepository, UserRepository},
    services::pagination::{Page, PageRequest, Paginator},
};

pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    paginator: Paginator,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            groups,
            users,
            quizzes,
            attempts,
            paginator,
        }
    }

    fn not_found(group_id: &str) -> AppError {
        AppError::NotFound(format!("Group with id '{}' not found", group_id))
    }

    async fn get_group(&self, group_id: &str) -> AppResult<Group> {
        self.groups
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| Self::not_found(group_id))
    }

    /// Groups of other owners are reported as missing.
    async fn owned_group(&self, owner_id: &str, group_id: &str) -> AppResult<Group> {
        let group = self.get_group(group_id).await?;
        if group.owner_id != owner_id {
            return Err(Self::not_found(group_id));
        }
        Ok(group)
    }

    async fn ensure_title_free(&self, title: &str) -> AppResult<()> {
        if self.groups.find_by_title(title).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Group with title '{}' already exists",
                title
            )));
        }
        Ok(())
    }

    pub async fn create_group(&self, owner_id: &str, request: CreateGroupRequest) -> AppResult<Group> {
        request.validate()?;
        self.ensure_title_free(&request.title).await?;

        let group = self.groups.create(Group::new(&request.title, owner_id)).await?;
        log::info!("Group {} created by {}", group.id, owner_id);
        Ok(group)
    }

    pub async fn get_owned_group(&self, owner_id: &str, group_id: &str) -> AppResult<GroupDto> {
        let group = self.owned_group(owner_id, group_id).await?;
        Ok(GroupDto::from(group))
    }

    pub async fn rename_group(
        &self,
        owner_id: &str,
        group_id: &str,
        request: RenameGroupRequest,
    ) -> AppResult<()> {
        request.validate()?;
        let group = self.owned_group(owner_id, group_id).await?;
        if group.title == request.title {
            return Ok(());
        }
        self.ensure_title_free(&request.title).await?;
        self.groups.rename(group_id, &request.title).await
    }

    pub async fn delete_group(&self, owner_id: &str, group_id: &str) -> AppResult<()> {
        self.owned_group(owner_id, group_id).await?;
        self.groups.delete_cascade(group_id).await
    }

    async fn list(&self, query: GroupQuery, page: PageRequest) -> AppResult<Page<Group>> {
        let total = self.groups.count(&query).await?;
        let groups = self.groups.clone();
        self.paginator
            .paginate(total, page, |window| async move {
                groups.list(&query, window).await
            })
            .await
    }

    /// All groups, with their owner's user name.
    pub async fn list_groups(
        &self,
        title: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<GroupDto>> {
        let query = GroupQuery {
            title_contains: title,
            ..Default::default()
        };
        let page = self.list(query, page).await?;

        let owner_ids: Vec<String> = page
            .items
            .iter()
            .map(|g| g.owner_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let owners: HashMap<String, String> = self
            .users
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user.user_name))
            .collect();

        Ok(page.map(|group| {
            let owner_name = owners.get(&group.owner_id).cloned();
            GroupDto {
                owner_name,
                ..GroupDto::from(group)
            }
        }))
    }

    pub async fn list_owned_groups(
        &self,
        owner_id: &str,
        title: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<GroupDto>> {
        let query = GroupQuery {
            title_contains: title,
            owner_id: Some(owner_id.to_string()),
            ..Default::default()
        };
        Ok(self.list(query, page).await?.map(GroupDto::from))
    }

    pub async fn list_subscribed_groups(
        &self,
        user_id: &str,
        title: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<GroupDto>> {
        let query = GroupQuery {
            title_contains: title,
            member_id: Some(user_id.to_string()),
            ..Default::default()
        };
        Ok(self.list(query, page).await?.map(GroupDto::from))
    }

    /// Adds every listed user or none of them.
    pub async fn add_members(
        &self,
        owner_id: &str,
        group_id: &str,
        request: MembersRequest,
    ) -> AppResult<()> {
        request.validate()?;
        let group = self.owned_group(owner_id, group_id).await?;
        let user_ids = dedup(request.user_ids);

        let found = self.users.find_by_ids(&user_ids).await?;
        if let Some(missing) = user_ids
            .iter()
            .find(|id| !found.iter().any(|user| &user.id == *id))
        {
            return Err(AppError::NotFound(format!(
                "User with id '{}' not found",
                missing
            )));
        }
        if let Some(member) = user_ids.iter().find(|id| group.has_member(id)) {
            return Err(AppError::AlreadyExists(format!(
                "User '{}' is already a member",
                member
            )));
        }

        self.groups.add_members(group_id, &user_ids).await
    }

    /// Removes every listed member or none of them.
    pub async fn remove_members(
        &self,
        owner_id: &str,
        group_id: &str,
        request: MembersRequest,
    ) -> AppResult<()> {
        request.validate()?;
        let group = self.owned_group(owner_id, group_id).await?;
        let user_ids = dedup(request.user_ids);

        if let Some(stranger) = user_ids.iter().find(|id| !group.has_member(id)) {
            return Err(AppError::NotFound(format!(
                "User '{}' is not a member",
                stranger
            )));
        }

        self.groups.remove_members(group_id, &user_ids).await
    }

    /// Members of an owned group, ordered by user name.
    pub async fn list_members(
        &self,
        owner_id: &str,
        group_id: &str,
        user_name: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<PublicProfileDto>> {
        let group = self.owned_group(owner_id, group_id).await?;

        let mut members: Vec<PublicProfileDto> = self
            .users
            .find_by_ids(&group.member_ids)
            .await?
            .into_iter()
            .filter(|user| contains_ignore_case(&user.user_name, user_name.as_deref()))
            .map(PublicProfileDto::from)
            .collect();
        members.sort_by(|a, b| a.user_name.cmp(&b.user_name).then_with(|| a.id.cmp(&b.id)));

        let total = members.len() as u64;
        self.paginator
            .paginate(total, page, |window| async move { Ok(window.slice(&members)) })
            .await
    }

    pub async fn subscribe(&self, user_id: &str, group_id: &str) -> AppResult<()> {
        let group = self.get_group(group_id).await?;
        if group.has_member(user_id) {
            return Err(AppError::Conflict("Already subscribed".to_string()));
        }
        self.groups
            .add_members(group_id, &[user_id.to_string()])
            .await
    }

    pub async fn unsubscribe(&self, user_id: &str, group_id: &str) -> AppResult<()> {
        let group = self.get_group(group_id).await?;
        if !group.has_member(user_id) {
            return Err(AppError::Conflict("Not subscribed".to_string()));
        }
        self.groups
            .remove_members(group_id, &[user_id.to_string()])
            .await
    }

    /// Members ranked by their total score on the group's quizzes. Members
    /// without attempts appear with a zero score.
    pub async fn group_leaderboard(
        &self,
        group_id: &str,
        filter: LeaderboardFilter,
        page: PageRequest,
    ) -> AppResult<Page<LeaderboardEntry>> {
        let group = self.get_group(group_id).await?;
        let quiz_ids = self
            .quizzes
            .find_ids(&QuizQuery {
                scope: GroupScope::Group(group_id.to_string()),
                ..Default::default()
            })
            .await?;

        let query = LeaderboardQuery {
            member_ids: group.member_ids,
            quiz_ids,
            name_contains: filter.name_contains,
            min_score: filter.min_score,
            max_score: filter.max_score,
            sort: filter.sort,
        };

        let total = self.attempts.leaderboard_count(&query).await?;
        let attempts = self.attempts.clone();
        self.paginator
            .paginate(total, page, |window| async move {
                attempts.leaderboard(&query, window).await
            })
            .await
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
