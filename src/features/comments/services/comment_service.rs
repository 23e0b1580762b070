use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::comments::dtos::{CommentDto, CommentFeedDto, CommentStatsDto};
use crate::features::comments::models::{Comment, CommentTab, CommentWithDepartment, Reaction};
use crate::features::shares::ShareService;
use crate::modules::change_feed::{ChangeEvent, ChangeFeed};
use crate::modules::subscription::{wait_for_change, Subscription};
use crate::shared::constants::RECENT_WINDOW_DAYS;

const COMMENT_COLUMNS: &str = "c.id, c.file_id, c.file_name, c.comment_by, c.comment_by_email, \
     c.comment_to, c.body, c.created_at, c.edited_at, c.likes, c.dislikes, c.reply_to, c.has_response";

/// Message used when a live comments query fails
pub const FEED_FAILURE_MESSAGE: &str = "Failed to process comments update";

/// Trimmed comment text; blank text is rejected with `empty_message`
pub fn normalize_body(body: &str, empty_message: &str) -> Result<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(empty_message.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn compute_comment_stats<'a>(
    user_id: Uuid,
    comments: impl IntoIterator<Item = &'a Comment>,
    now: DateTime<Utc>,
) -> CommentStatsDto {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let mut stats = CommentStatsDto::default();

    for comment in comments {
        if comment.comment_by == user_id {
            stats.total_sent += 1;
        }
        if comment.comment_to == user_id {
            stats.total_received += 1;
            if !comment.has_response {
                stats.pending_responses += 1;
            }
        }
        if comment.created_at > cutoff {
            stats.recent_comments += 1;
        }
    }
    stats
}

/// Recipient of a reply by `user_id` to `parent`: the parent's author.
/// Only the addressee of a comment can answer it.
pub fn reply_recipient(parent: &Comment, user_id: Uuid) -> Result<Uuid> {
    if parent.comment_to != user_id {
        return Err(AppError::Forbidden(
            "You can only reply to comments addressed to you".to_string(),
        ));
    }
    Ok(parent.comment_by)
}

fn tab_filter(tab: CommentTab) -> &'static str {
    match tab {
        // both directions, so the tab's count matches sent + received
        CommentTab::All => "(c.comment_by = $1 OR c.comment_to = $1)",
        CommentTab::Sent => "c.comment_by = $1",
        CommentTab::Received => "c.comment_to = $1",
    }
}

#[derive(Debug, Clone)]
pub enum CommentStreamEvent {
    Comments(CommentFeedDto),
    Notification(String),
}

pub struct CommentService {
    pool: PgPool,
    shares: Arc<ShareService>,
    change_feed: ChangeFeed,
}

impl CommentService {
    pub fn new(pool: PgPool, shares: Arc<ShareService>, change_feed: ChangeFeed) -> Self {
        Self {
            pool,
            shares,
            change_feed,
        }
    }

    /// Comment on a share link. The recipient is the other participant.
    pub async fn create(
        &self,
        author_id: Uuid,
        author_email: &str,
        share_id: Uuid,
        body: &str,
    ) -> Result<Comment> {
        let body = normalize_body(body, "Please enter a comment")?;
        let link = self.shares.find(share_id).await?;
        if !link.involves(author_id) {
            return Err(AppError::Forbidden(
                "You are not part of this share".to_string(),
            ));
        }
        let recipient_id = link.counterpart(author_id);

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO file_comments (file_id, file_name, comment_by, comment_by_email, comment_to, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(link.file_id)
        .bind(&link.file_name)
        .bind(author_id)
        .bind(author_email)
        .bind(recipient_id)
        .bind(&body)
        .fetch_one(&self.pool)
        .await?;

        info!("Comment {} sent by {} to {}", comment.id, author_id, recipient_id);
        self.publish(&comment);
        Ok(comment)
    }

    pub async fn find(&self, comment_id: Uuid) -> Result<Comment> {
        sqlx::query_as::<_, Comment>("SELECT * FROM file_comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// One comment with its author's department
    pub async fn find_with_department(&self, comment_id: Uuid) -> Result<CommentWithDepartment> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}, u.department AS author_department
            FROM file_comments c
            LEFT JOIN users u ON u.id = c.comment_by
            WHERE c.id = $1
            "#
        );
        sqlx::query_as::<_, CommentWithDepartment>(&sql)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    /// Comments for a tab, newest first, with the author's department
    pub async fn list(&self, user_id: Uuid, tab: CommentTab) -> Result<Vec<CommentWithDepartment>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}, u.department AS author_department
            FROM file_comments c
            LEFT JOIN users u ON u.id = c.comment_by
            WHERE {}
            ORDER BY c.created_at DESC
            "#,
            tab_filter(tab)
        );
        let rows = sqlx::query_as::<_, CommentWithDepartment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Bare comments for a tab, newest first
    pub async fn comments(&self, user_id: Uuid, tab: CommentTab) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM file_comments c WHERE {} ORDER BY c.created_at DESC",
            tab_filter(tab)
        );
        let rows = sqlx::query_as::<_, Comment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Number of comments written by `user_id`
    pub async fn authored_count(&self, user_id: Uuid) -> Result<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM file_comments WHERE comment_by = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<CommentStatsDto> {
        let comments = self.comments(user_id, CommentTab::All).await?;
        Ok(compute_comment_stats(user_id, &comments, Utc::now()))
    }

    /// Tab listing plus stats over the listed comments
    pub async fn feed(&self, user_id: Uuid, tab: CommentTab) -> Result<CommentFeedDto> {
        let rows = self.list(user_id, tab).await?;
        let stats = compute_comment_stats(user_id, rows.iter().map(|r| &r.comment), Utc::now());
        Ok(CommentFeedDto {
            comments: rows.into_iter().map(CommentDto::from).collect(),
            stats,
        })
    }

    /// Author only; sets `edited_at`
    pub async fn edit(&self, user_id: Uuid, comment_id: Uuid, body: &str) -> Result<Comment> {
        let body = normalize_body(body, "Please enter a comment")?;
        let existing = self.find(comment_id).await?;
        if existing.comment_by != user_id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }

        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE file_comments SET body = $2, edited_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(comment_id)
        .bind(&body)
        .fetch_one(&self.pool)
        .await?;

        self.publish(&comment);
        Ok(comment)
    }

    /// Author only
    pub async fn delete(&self, user_id: Uuid, comment_id: Uuid) -> Result<()> {
        let existing = self.find(comment_id).await?;
        if existing.comment_by != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        sqlx::query("DELETE FROM file_comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        info!("Comment {} deleted by {}", comment_id, user_id);
        self.publish(&existing);
        Ok(())
    }

    /// Increment a reaction counter in place
    pub async fn react(&self, user_id: Uuid, comment_id: Uuid, reaction: Reaction) -> Result<Comment> {
        let existing = self.find(comment_id).await?;
        if existing.comment_by != user_id && existing.comment_to != user_id {
            return Err(AppError::Forbidden(
                "You are not part of this conversation".to_string(),
            ));
        }

        let column = reaction.column();
        let sql = format!(
            "UPDATE file_comments SET {column} = {column} + 1 WHERE id = $1 RETURNING *"
        );
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .fetch_one(&self.pool)
            .await?;

        self.publish(&comment);
        Ok(comment)
    }

    /// Reply to a received comment: the reply goes to the parent's author and
    /// the parent is flagged as answered, both in one transaction.
    pub async fn reply(
        &self,
        user_id: Uuid,
        user_email: &str,
        parent_id: Uuid,
        body: &str,
    ) -> Result<Comment> {
        let body = normalize_body(body, "Please enter a reply")?;
        let parent = self.find(parent_id).await?;
        let recipient_id = reply_recipient(&parent, user_id)?;

        let mut tx = self.pool.begin().await?;
        let reply = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO file_comments
                (file_id, file_name, comment_by, comment_by_email, comment_to, body, reply_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(parent.file_id)
        .bind(&parent.file_name)
        .bind(user_id)
        .bind(user_email)
        .bind(recipient_id)
        .bind(&body)
        .bind(parent.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE file_comments SET has_response = TRUE WHERE id = $1")
            .bind(parent.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Comment {} answered by {}", parent.id, reply.id);
        self.publish(&reply);
        Ok(reply)
    }

    /// Live feed for one tab. The query re-runs on every comment change
    /// involving the user; the returned handle owns the subscription task.
    pub fn watch(
        self: &Arc<Self>,
        user_id: Uuid,
        tab: CommentTab,
    ) -> (mpsc::Receiver<CommentStreamEvent>, Subscription) {
        let (tx, rx) = mpsc::channel(16);
        let service = Arc::clone(self);
        let mut changes = self.change_feed.subscribe();

        let subscription = Subscription::spawn(async move {
            loop {
                let event = match service.feed(user_id, tab).await {
                    Ok(feed) => CommentStreamEvent::Comments(feed),
                    Err(e) => {
                        error!("Comments feed for {} failed: {}", user_id, e);
                        let _ = tx
                            .send(CommentStreamEvent::Notification(
                                FEED_FAILURE_MESSAGE.to_string(),
                            ))
                            .await;
                        break;
                    }
                };
                if tx.send(event).await.is_err() {
                    return;
                }
                let changed = wait_for_change(&mut changes, user_id, |e| {
                    matches!(e, ChangeEvent::CommentsChanged { .. })
                })
                .await;
                if !changed {
                    break;
                }
            }
            // keep the stream open, without updates, until the client leaves
            tx.closed().await;
        });

        (rx, subscription)
    }

    fn publish(&self, comment: &Comment) {
        self.change_feed.publish(ChangeEvent::CommentsChanged {
            author_id: comment.comment_by,
            recipient_id: comment.comment_to,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::lazy_test_pool;
    use crate::features::comments::models::comment::test_comment;
    use crate::features::shares::dtos::ShareFileDto;

    fn service() -> Arc<CommentService> {
        let feed = ChangeFeed::default();
        let shares = Arc::new(ShareService::new(lazy_test_pool(), feed.clone()));
        Arc::new(CommentService::new(lazy_test_pool(), shares, feed))
    }

    #[test]
    fn test_normalize_body() {
        assert_eq!(normalize_body("  hello \n", "empty").unwrap(), "hello");
        assert!(matches!(
            normalize_body("   ", "Please enter a comment"),
            Err(AppError::Validation(msg)) if msg == "Please enter a comment"
        ));
    }

    #[test]
    fn test_comment_stats() {
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let mut answered = test_comment(other, me, now - Duration::days(2));
        answered.has_response = true;
        let comments = vec![
            test_comment(me, other, now - Duration::days(1)),
            test_comment(other, me, now - Duration::days(10)),
            answered,
        ];

        let stats = compute_comment_stats(me, &comments, now);

        assert_eq!(
            stats,
            CommentStatsDto {
                total_sent: 1,
                total_received: 2,
                recent_comments: 2,
                pending_responses: 1,
            }
        );
    }

    #[test]
    fn test_reply_to_a_goes_to_a() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let parent = test_comment(a, b, Utc::now());

        assert_eq!(reply_recipient(&parent, b).unwrap(), a);
        assert!(matches!(
            reply_recipient(&parent, a),
            Err(AppError::Forbidden(_))
        ));
    }

    const ALICE: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
    const BOB: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222222);
    const CAROL: Uuid = Uuid::from_u128(0x33333333_3333_3333_3333_333333333333);
    const REPORT: Uuid = Uuid::from_u128(0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa);

    /// Alice shares the report with Bob and opens the thread
    async fn thread(pool: &PgPool) -> (CommentService, Comment) {
        let feed = ChangeFeed::default();
        let shares = Arc::new(ShareService::new(pool.clone(), feed.clone()));
        let links = shares
            .share(
                ALICE,
                &ShareFileDto {
                    file_id: REPORT,
                    department: "OPG".to_string(),
                    recipient_ids: vec![BOB],
                },
            )
            .await
            .unwrap();
        let service = CommentService::new(pool.clone(), shares, feed);
        let opening = service
            .create(ALICE, "alice@example.gov", links[0].id, "Please review section 2")
            .await
            .unwrap();
        (service, opening)
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_reply_goes_to_parent_author_and_flags_parent(pool: PgPool) {
        let (service, opening) = thread(&pool).await;
        assert_eq!(opening.comment_to, BOB);
        assert!(!opening.has_response);

        let reply = service
            .reply(BOB, "bob@example.gov", opening.id, " Done ")
            .await
            .unwrap();

        assert_eq!(reply.comment_by, BOB);
        assert_eq!(reply.comment_to, ALICE);
        assert_eq!(reply.reply_to, Some(opening.id));
        assert_eq!(reply.body, "Done");
        assert!(service.find(opening.id).await.unwrap().has_response);
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_author_cannot_answer_own_comment(pool: PgPool) {
        let (service, opening) = thread(&pool).await;

        let result = service
            .reply(ALICE, "alice@example.gov", opening.id, "bump")
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(!service.find(opening.id).await.unwrap().has_response);
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_reactions_increment_in_place(pool: PgPool) {
        let (service, opening) = thread(&pool).await;

        service.react(BOB, opening.id, Reaction::Like).await.unwrap();
        service.react(ALICE, opening.id, Reaction::Like).await.unwrap();
        let after = service.react(BOB, opening.id, Reaction::Dislike).await.unwrap();

        assert_eq!((after.likes, after.dislikes), (2, 1));
        assert!(matches!(
            service.react(CAROL, opening.id, Reaction::Like).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_tab_filters_bind_the_user_once() {
        for tab in [CommentTab::All, CommentTab::Sent, CommentTab::Received] {
            assert!(tab_filter(tab).contains("$1"));
            assert!(!tab_filter(tab).contains("$2"));
        }
    }

    #[tokio::test]
    async fn test_blank_edit_is_rejected_before_lookup() {
        let result = service().edit(Uuid::new_v4(), Uuid::new_v4(), "  ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_watch_notifies_once_on_query_failure() {
        let (mut rx, _subscription) = service().watch(Uuid::new_v4(), CommentTab::All);

        match rx.recv().await {
            Some(CommentStreamEvent::Notification(msg)) => assert_eq!(msg, FEED_FAILURE_MESSAGE),
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropping_watch_handle_closes_stream() {
        let (mut rx, subscription) = service().watch(Uuid::new_v4(), CommentTab::Sent);
        drop(subscription);

        // the task is aborted, so the sender side goes away
        while let Some(event) = rx.recv().await {
            assert!(matches!(event, CommentStreamEvent::Notification(_)));
        }
    }
}
