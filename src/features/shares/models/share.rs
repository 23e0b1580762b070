use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::BTreeSet;
use uuid::Uuid;

/// One file shared with one recipient
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShareLink {
    pub id: Uuid,
    pub file_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub shared_by: Uuid,
    pub shared_with: Uuid,
    /// Department the recipients were picked from
    pub department_id: String,
    pub shared_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.shared_by == user_id || self.shared_with == user_id
    }

    /// The participant that is not `user_id`
    pub fn counterpart(&self, user_id: Uuid) -> Uuid {
        if self.shared_by == user_id {
            self.shared_with
        } else {
            self.shared_by
        }
    }
}

/// A link joined with the other participant's account
#[derive(Debug, Clone, FromRow)]
pub struct ShareLinkWithUser {
    #[sqlx(flatten)]
    pub link: ShareLink,
    pub user_email: Option<String>,
    pub user_department: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollaborationSummary {
    pub collaborations: i64,
    /// Distinct users on the other side of a link
    pub collaborators: i64,
    /// Distinct department tags across links
    pub departments: i64,
}

pub fn collaboration_summary<'a>(
    user_id: Uuid,
    links: impl IntoIterator<Item = &'a ShareLink>,
) -> CollaborationSummary {
    let mut collaborations = 0;
    let mut collaborators = BTreeSet::new();
    let mut departments = BTreeSet::new();

    for link in links {
        collaborations += 1;
        for participant in [link.shared_by, link.shared_with] {
            if participant != user_id {
                collaborators.insert(participant);
            }
        }
        if !link.department_id.is_empty() {
            departments.insert(link.department_id.as_str());
        }
    }

    CollaborationSummary {
        collaborations,
        collaborators: collaborators.len() as i64,
        departments: departments.len() as i64,
    }
}

#[cfg(test)]
pub(crate) fn test_link(
    shared_by: Uuid,
    shared_with: Uuid,
    department: &str,
    shared_at: DateTime<Utc>,
) -> ShareLink {
    ShareLink {
        id: Uuid::new_v4(),
        file_id: Uuid::new_v4(),
        file_name: "report.pdf".to_string(),
        file_url: "http://storage.test/report.pdf".to_string(),
        shared_by,
        shared_with,
        department_id: department.to_string(),
        shared_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let link = test_link(a, b, "PTO", Utc::now());
        assert_eq!(link.counterpart(a), b);
        assert_eq!(link.counterpart(b), a);
        assert!(link.involves(a));
        assert!(!link.involves(Uuid::new_v4()));
    }

    #[test]
    fn test_collaboration_summary_excludes_self() {
        let (me, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let now = Utc::now();
        let links = vec![
            test_link(me, b, "PTO", now),
            test_link(me, c, "PTO", now),
            test_link(b, me, "OPG", now),
        ];

        let summary = collaboration_summary(me, &links);

        assert_eq!(
            summary,
            CollaborationSummary {
                collaborations: 3,
                collaborators: 2,
                departments: 2,
            }
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            collaboration_summary(Uuid::new_v4(), &[]),
            CollaborationSummary::default()
        );
    }
}
