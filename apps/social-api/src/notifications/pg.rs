//! Postgres-backed notification store.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use social_common::SnowflakeGenerator;

use crate::db::pool::DbPool;
use crate::db::schema::notifications;
use crate::models::notification::{
    NewNotification, Notification, NotificationDraft, NotificationFilter, NotificationPage,
};

use super::store::NotificationStore;
use super::NotificationError;

pub struct PgNotificationStore {
    db: DbPool,
    snowflake: Arc<SnowflakeGenerator>,
}

impl PgNotificationStore {
    pub fn new(db: DbPool, snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self { db, snowflake }
    }
}

/// Rows addressed to `user_id`, narrowed by `filter`.
fn owned_by(user_id: &str, filter: NotificationFilter) -> notifications::BoxedQuery<'_, Pg> {
    let query = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .into_boxed();
    match filter {
        NotificationFilter::All => query,
        NotificationFilter::Unread => query.filter(notifications::read.eq(false)),
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, draft: NotificationDraft) -> Result<Notification, NotificationError> {
        let mut conn = self.db.get().await?;
        let id = self.snowflake.generate();

        let notification: Notification = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(notifications::table)
                .values(NewNotification::from_draft(id, &draft))
                .returning(Notification::as_returning()),
            &mut conn,
        )
        .await?;

        Ok(notification)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, NotificationError> {
        let mut conn = self.db.get().await?;

        let notification = diesel_async::RunQueryDsl::get_result(
            notifications::table
                .find(id)
                .select(Notification::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
        filter: NotificationFilter,
    ) -> Result<NotificationPage, NotificationError> {
        let mut conn = self.db.get().await?;
        let offset = offset.max(0);

        let notifications: Vec<Notification> = diesel_async::RunQueryDsl::load(
            owned_by(user_id, filter)
                .order((notifications::created_at.desc(), notifications::id.desc()))
                .offset(offset)
                .limit(limit.max(0))
                .select(Notification::as_select()),
            &mut conn,
        )
        .await?;

        let total_count: i64 = diesel_async::RunQueryDsl::get_result(
            owned_by(user_id, filter).select(count_star()),
            &mut conn,
        )
        .await?;

        let has_more = offset + (notifications.len() as i64) < total_count;

        Ok(NotificationPage {
            notifications,
            has_more,
            total_count,
        })
    }

    async fn count_unread(&self, user_id: &str) -> Result<i64, NotificationError> {
        let mut conn = self.db.get().await?;

        let count: i64 = diesel_async::RunQueryDsl::get_result(
            owned_by(user_id, NotificationFilter::Unread).select(count_star()),
            &mut conn,
        )
        .await?;

        Ok(count)
    }

    async fn mark_read(&self, id: i64) -> Result<Notification, NotificationError> {
        let mut conn = self.db.get().await?;

        diesel_async::RunQueryDsl::get_result(
            diesel::update(notifications::table.find(id))
                .set(notifications::read.eq(true))
                .returning(Notification::as_returning()),
            &mut conn,
        )
        .await
        .optional()?
        .ok_or(NotificationError::NotFound)
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut conn = self.db.get().await?;

        let changed = diesel_async::RunQueryDsl::execute(
            diesel::update(
                notifications::table
                    .filter(notifications::user_id.eq(user_id))
                    .filter(notifications::read.eq(false)),
            )
            .set(notifications::read.eq(true)),
            &mut conn,
        )
        .await?;

        Ok(changed as u64)
    }

    async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, NotificationError> {
        let mut conn = self.db.get().await?;

        let deleted = diesel_async::RunQueryDsl::execute(
            diesel::delete(notifications::table.filter(notifications::user_id.eq(user_id))),
            &mut conn,
        )
        .await?;

        Ok(deleted as u64)
    }
}
