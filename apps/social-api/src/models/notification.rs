use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::notifications;

/// What the actor did.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Like,
    Comment,
    Reply,
    Follow,
    CommunityJoin,
    PostShare,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Comment => "COMMENT",
            Self::Reply => "REPLY",
            Self::Follow => "FOLLOW",
            Self::CommunityJoin => "COMMUNITY_JOIN",
            Self::PostShare => "POST_SHARE",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(Self::Like),
            "COMMENT" => Ok(Self::Comment),
            "REPLY" => Ok(Self::Reply),
            "FOLLOW" => Ok(Self::Follow),
            "COMMUNITY_JOIN" => Ok(Self::CommunityJoin),
            "POST_SHARE" => Ok(Self::PostShare),
            other => Err(UnknownNotificationType(other.to_string())),
        }
    }
}

impl ToSql<Text, Pg> for NotificationType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for NotificationType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Ok(raw.parse()?)
    }
}

fn serialize_i64_as_string<S: serde::Serializer>(val: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&val.to_string())
}

/// A persisted notification. Everything except `read` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    #[serde(serialize_with = "serialize_i64_as_string")]
    #[schema(value_type = String)]
    pub id: i64,
    /// Recipient.
    pub user_id: String,
    pub actor_id: String,
    pub actor_name: String,
    #[serde(rename = "type")]
    pub type_: NotificationType,
    /// The post, comment, user or community the notification is about.
    pub reference_id: String,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub user_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub type_: NotificationType,
    pub reference_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationDraft {
    /// Materialize the draft with a store-assigned id.
    pub fn into_notification(self, id: i64) -> Notification {
        Notification {
            id,
            user_id: self.user_id,
            actor_id: self.actor_id,
            actor_name: self.actor_name,
            type_: self.type_,
            reference_id: self.reference_id,
            content: self.content,
            read: false,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification<'a> {
    pub id: i64,
    pub user_id: &'a str,
    pub actor_id: &'a str,
    pub actor_name: &'a str,
    pub type_: NotificationType,
    pub reference_id: &'a str,
    pub content: &'a str,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewNotification<'a> {
    pub fn from_draft(id: i64, draft: &'a NotificationDraft) -> Self {
        Self {
            id,
            user_id: &draft.user_id,
            actor_id: &draft.actor_id,
            actor_name: &draft.actor_name,
            type_: draft.type_,
            reference_id: &draft.reference_id,
            content: &draft.content,
            read: false,
            created_at: draft.created_at,
        }
    }
}

/// Which notifications a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
}

/// One page of a recipient's notifications, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub has_more: bool,
    pub total_count: i64,
}
