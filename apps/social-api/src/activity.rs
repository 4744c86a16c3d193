//! Notification hooks for feature code (likes, comments, follows, ...).
//!
//! Each hook runs after the triggering action has been committed. A failed
//! notification is logged and swallowed so the action itself never appears
//! to fail.

use std::sync::Arc;

use crate::auth::identity::Identity;
use crate::models::notification::{Notification, NotificationType};
use crate::notifications::NotificationDispatcher;

#[derive(Clone)]
pub struct ActivityNotifier {
    dispatcher: Arc<NotificationDispatcher>,
}

impl ActivityNotifier {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// `actor` liked `post_id`, owned by `post_owner_id`.
    pub async fn post_liked(
        &self,
        actor: &Identity,
        post_owner_id: &str,
        post_id: &str,
    ) -> Option<Notification> {
        self.send(actor, post_owner_id, NotificationType::Like, post_id, "liked your post")
            .await
    }

    pub async fn post_commented(
        &self,
        actor: &Identity,
        post_owner_id: &str,
        post_id: &str,
    ) -> Option<Notification> {
        self.send(
            actor,
            post_owner_id,
            NotificationType::Comment,
            post_id,
            "commented on your post",
        )
        .await
    }

    /// The reference is the parent comment, not the reply.
    pub async fn comment_replied(
        &self,
        actor: &Identity,
        parent_author_id: &str,
        parent_comment_id: &str,
    ) -> Option<Notification> {
        self.send(
            actor,
            parent_author_id,
            NotificationType::Reply,
            parent_comment_id,
            "replied to your comment",
        )
        .await
    }

    /// The reference is the follower's own user id.
    pub async fn user_followed(&self, actor: &Identity, followed_id: &str) -> Option<Notification> {
        self.send(
            actor,
            followed_id,
            NotificationType::Follow,
            &actor.user_id,
            "started following you",
        )
        .await
    }

    /// Notify every admin of `community_id` that `actor` joined.
    pub async fn community_joined(
        &self,
        actor: &Identity,
        community_id: &str,
        admin_ids: &[String],
    ) -> Vec<Notification> {
        let mut sent = Vec::with_capacity(admin_ids.len());
        for admin_id in admin_ids {
            if let Some(n) = self
                .send(
                    actor,
                    admin_id,
                    NotificationType::CommunityJoin,
                    community_id,
                    "joined your community",
                )
                .await
            {
                sent.push(n);
            }
        }
        sent
    }

    pub async fn post_shared(
        &self,
        actor: &Identity,
        post_owner_id: &str,
        post_id: &str,
    ) -> Option<Notification> {
        self.send(
            actor,
            post_owner_id,
            NotificationType::PostShare,
            post_id,
            "shared your post",
        )
        .await
    }

    async fn send(
        &self,
        actor: &Identity,
        recipient_id: &str,
        type_: NotificationType,
        reference_id: &str,
        action: &str,
    ) -> Option<Notification> {
        let content = format!("{} {action}", actor.username);
        match self
            .dispatcher
            .notify(
                recipient_id,
                &actor.user_id,
                &actor.username,
                type_,
                reference_id,
                &content,
            )
            .await
        {
            Ok(notification) => notification,
            Err(e) => {
                tracing::error!(
                    user_id = %recipient_id,
                    actor_id = %actor.user_id,
                    %type_,
                    %reference_id,
                    error = %e,
                    "failed to record notification"
                );
                None
            }
        }
    }
}
