use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::activities::models::ActivityType;
use crate::features::activities::ActivityService;
use crate::features::shares::dtos::{ShareFileDto, ShareStatsDto};
use crate::features::shares::models::{collaboration_summary, ShareLink, ShareLinkWithUser};
use crate::features::users::models::department::canonical_code;
use crate::modules::change_feed::{ChangeEvent, ChangeFeed};
use crate::shared::constants::RECENT_WINDOW_DAYS;

/// Recipients in request order, duplicates dropped
pub fn distinct_recipients(sharer_id: Uuid, recipient_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let mut seen = HashSet::new();
    let recipients: Vec<Uuid> = recipient_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if recipients.is_empty() {
        return Err(AppError::Validation(
            "Please select at least one user".to_string(),
        ));
    }
    if recipients.contains(&sharer_id) {
        return Err(AppError::Validation(
            "You cannot share a file with yourself".to_string(),
        ));
    }
    Ok(recipients)
}

pub fn compute_share_stats(
    user_id: Uuid,
    received: &[ShareLink],
    shared: &[ShareLink],
    now: DateTime<Utc>,
) -> ShareStatsDto {
    let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
    let all = || received.iter().chain(shared.iter());
    let summary = collaboration_summary(user_id, all());

    ShareStatsDto {
        total_received: received.len() as i64,
        total_shared: shared.len() as i64,
        recent_shares: all().filter(|l| l.shared_at > cutoff).count() as i64,
        collaborators: summary.collaborators,
        departments: summary.departments,
    }
}

pub struct ShareService {
    pool: PgPool,
    change_feed: ChangeFeed,
}

impl ShareService {
    pub fn new(pool: PgPool, change_feed: ChangeFeed) -> Self {
        Self { pool, change_feed }
    }

    /// Write one link per recipient; either every link is created or none
    pub async fn share(&self, sharer_id: Uuid, dto: &ShareFileDto) -> Result<Vec<ShareLink>> {
        let department = canonical_code(&dto.department)
            .ok_or_else(|| AppError::Validation("Please select a department".to_string()))?;
        let recipients = distinct_recipients(sharer_id, &dto.recipient_ids)?;

        let file = sqlx::query_as::<_, (Uuid, String, String)>(
            "SELECT owner_id, name, url FROM files WHERE id = $1",
        )
        .bind(dto.file_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
        let (owner_id, file_name, file_url) = file;

        if owner_id != sharer_id {
            return Err(AppError::Forbidden(
                "You can only share your own files".to_string(),
            ));
        }

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
                .bind(&recipients)
                .fetch_one(&self.pool)
                .await?;
        if existing != recipients.len() as i64 {
            return Err(AppError::NotFound(
                "One or more recipients do not exist".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let mut links = Vec::with_capacity(recipients.len());
        for recipient in &recipients {
            let link = sqlx::query_as::<_, ShareLink>(
                r#"
                INSERT INTO shared_files
                    (file_id, file_name, file_url, shared_by, shared_with, department_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, file_id, file_name, file_url, shared_by, shared_with,
                          department_id, shared_at
                "#,
            )
            .bind(dto.file_id)
            .bind(&file_name)
            .bind(&file_url)
            .bind(sharer_id)
            .bind(recipient)
            .bind(department)
            .fetch_one(&mut *tx)
            .await?;
            links.push(link);
        }
        ActivityService::record(&mut *tx, sharer_id, ActivityType::Share, &file_name).await?;
        tx.commit().await?;

        info!(
            "File {} shared by {} with {} recipient(s)",
            dto.file_id,
            sharer_id,
            links.len()
        );

        let mut participants = recipients;
        participants.push(sharer_id);
        self.change_feed
            .publish(ChangeEvent::SharesChanged { participants });
        self.change_feed
            .publish(ChangeEvent::ActivityRecorded { user_id: sharer_id });

        Ok(links)
    }

    pub async fn find(&self, link_id: Uuid) -> Result<ShareLink> {
        sqlx::query_as::<_, ShareLink>(
            r#"
            SELECT id, file_id, file_name, file_url, shared_by, shared_with, department_id, shared_at
            FROM shared_files WHERE id = $1
            "#,
        )
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Share not found".to_string()))
    }

    /// Links created by `user_id`, newest first
    pub async fn shared_by(&self, user_id: Uuid) -> Result<Vec<ShareLink>> {
        let links = sqlx::query_as::<_, ShareLink>(
            r#"
            SELECT id, file_id, file_name, file_url, shared_by, shared_with, department_id, shared_at
            FROM shared_files WHERE shared_by = $1
            ORDER BY shared_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    /// Links addressed to `user_id`, newest first
    pub async fn shared_with(&self, user_id: Uuid) -> Result<Vec<ShareLink>> {
        let links = sqlx::query_as::<_, ShareLink>(
            r#"
            SELECT id, file_id, file_name, file_url, shared_by, shared_with, department_id, shared_at
            FROM shared_files WHERE shared_with = $1
            ORDER BY shared_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    /// Most recent links in either direction
    pub async fn recent_for(&self, user_id: Uuid, limit: i64) -> Result<Vec<ShareLink>> {
        let links = sqlx::query_as::<_, ShareLink>(
            r#"
            SELECT id, file_id, file_name, file_url, shared_by, shared_with, department_id, shared_at
            FROM shared_files
            WHERE shared_by = $1 OR shared_with = $1
            ORDER BY shared_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    /// Received links joined with the sharer's account
    pub async fn received_with_sharers(&self, user_id: Uuid) -> Result<Vec<ShareLinkWithUser>> {
        let rows = sqlx::query_as::<_, ShareLinkWithUser>(
            r#"
            SELECT s.id, s.file_id, s.file_name, s.file_url, s.shared_by, s.shared_with,
                   s.department_id, s.shared_at,
                   u.email AS user_email, u.department AS user_department
            FROM shared_files s
            LEFT JOIN users u ON u.id = s.shared_by
            WHERE s.shared_with = $1
            ORDER BY s.shared_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sent links joined with the recipient's account
    pub async fn sent_with_recipients(&self, user_id: Uuid) -> Result<Vec<ShareLinkWithUser>> {
        let rows = sqlx::query_as::<_, ShareLinkWithUser>(
            r#"
            SELECT s.id, s.file_id, s.file_name, s.file_url, s.shared_by, s.shared_with,
                   s.department_id, s.shared_at,
                   u.email AS user_email, u.department AS user_department
            FROM shared_files s
            LEFT JOIN users u ON u.id = s.shared_with
            WHERE s.shared_by = $1
            ORDER BY s.shared_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<ShareStatsDto> {
        let (received, shared) =
            tokio::try_join!(self.shared_with(user_id), self.shared_by(user_id))?;
        Ok(compute_share_stats(user_id, &received, &shared, Utc::now()))
    }

    /// Remove a single link; either participant may revoke it
    pub async fn revoke(&self, user_id: Uuid, link_id: Uuid) -> Result<()> {
        let link = self.find(link_id).await?;
        if !link.involves(user_id) {
            return Err(AppError::Forbidden(
                "You are not part of this share".to_string(),
            ));
        }

        sqlx::query("DELETE FROM shared_files WHERE id = $1")
            .bind(link_id)
            .execute(&self.pool)
            .await?;

        info!("Share {} revoked by {}", link_id, user_id);
        self.change_feed.publish(ChangeEvent::SharesChanged {
            participants: vec![link.shared_by, link.shared_with],
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::lazy_test_pool;
    use crate::features::shares::models::share::test_link;

    #[test]
    fn test_distinct_recipients_keeps_order() {
        let (me, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let recipients = distinct_recipients(me, &[b, c, b]).unwrap();
        assert_eq!(recipients, vec![b, c]);
    }

    #[test]
    fn test_distinct_recipients_rejects_empty_and_self() {
        let me = Uuid::new_v4();
        assert!(matches!(
            distinct_recipients(me, &[]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            distinct_recipients(me, &[Uuid::new_v4(), me]),
            Err(AppError::Validation(_))
        ));
    }

    const ALICE: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
    const BOB: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222222);
    const CAROL: Uuid = Uuid::from_u128(0x33333333_3333_3333_3333_333333333333);
    const REPORT: Uuid = Uuid::from_u128(0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa);

    fn share_report(recipient_ids: Vec<Uuid>) -> ShareFileDto {
        ShareFileDto {
            file_id: REPORT,
            department: "opg".to_string(),
            recipient_ids,
        }
    }

    async fn link_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM shared_files")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_links_to_b_and_c_are_independent(pool: PgPool) {
        let service = ShareService::new(pool.clone(), ChangeFeed::default());

        let links = service
            .share(ALICE, &share_report(vec![BOB, CAROL]))
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.department_id == "OPG"));

        let to_bob = links.iter().find(|l| l.shared_with == BOB).unwrap();
        let to_carol = links.iter().find(|l| l.shared_with == CAROL).unwrap();
        service.revoke(BOB, to_bob.id).await.unwrap();

        assert!(matches!(
            service.find(to_bob.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.find(to_carol.id).await.unwrap().shared_with, CAROL);
        assert_eq!(service.shared_by(ALICE).await.unwrap().len(), 1);

        let activities: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM activities WHERE user_id = $1 AND activity_type = 'share'",
        )
        .bind(ALICE)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(activities, 1);
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_share_with_unknown_recipient_writes_nothing(pool: PgPool) {
        let service = ShareService::new(pool.clone(), ChangeFeed::default());

        let result = service
            .share(ALICE, &share_report(vec![BOB, Uuid::new_v4()]))
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(link_count(&pool).await, 0);
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_only_owner_can_share(pool: PgPool) {
        let service = ShareService::new(pool.clone(), ChangeFeed::default());

        let result = service.share(BOB, &share_report(vec![CAROL])).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(link_count(&pool).await, 0);
    }

    #[sqlx::test(
        migrations = "./migrations",
        fixtures(path = "../../../../fixtures", scripts("users", "files"))
    )]
    async fn test_bystander_cannot_revoke(pool: PgPool) {
        let service = ShareService::new(pool.clone(), ChangeFeed::default());
        let links = service.share(ALICE, &share_report(vec![BOB])).await.unwrap();

        let dave = Uuid::from_u128(0x44444444_4444_4444_4444_444444444444);
        let result = service.revoke(dave, links[0].id).await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(link_count(&pool).await, 1);
    }

    #[test]
    fn test_share_stats() {
        let (me, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let received = vec![
            test_link(b, me, "PTO", now - Duration::days(1)),
            test_link(c, me, "OPG", now - Duration::days(30)),
        ];
        let shared = vec![test_link(me, b, "PTO", now - Duration::days(8))];

        let stats = compute_share_stats(me, &received, &shared, now);

        assert_eq!(
            stats,
            ShareStatsDto {
                total_received: 2,
                total_shared: 1,
                recent_shares: 1,
                collaborators: 2,
                departments: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_share_with_unknown_department_is_rejected_before_db() {
        let service = ShareService::new(lazy_test_pool(), ChangeFeed::default());
        let dto = ShareFileDto {
            file_id: Uuid::new_v4(),
            department: "XYZ".to_string(),
            recipient_ids: vec![Uuid::new_v4()],
        };

        let result = service.share(Uuid::new_v4(), &dto).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
