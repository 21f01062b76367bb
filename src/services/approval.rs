//! Approval Workflow
//!
//! The admin-gated state machine governing course visibility. Courses start
//! at pending; `decide` moves them to approved or rejected. Re-deciding an
//! already decided course is permitted, which allows approved -> rejected and
//! back. A rejection always carries a reason; re-approval clears it.

use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{ApiError, Result};
use crate::models::{ApprovalRequest, Course, CourseStatus, NotificationKind};
use crate::services::catalog::load_course;
use crate::services::now_timestamp;

#[derive(Clone)]
pub struct ApprovalWorkflow {
    db: Database,
}

impl ApprovalWorkflow {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Apply an admin decision to a course and notify its trainer.
    ///
    /// Validation and authorization run before any write. The notification is
    /// a best-effort side effect: a missing trainer record or a failed insert
    /// is logged and swallowed, never rolling back the status transition.
    pub async fn decide(
        &self,
        auth: &AuthUser,
        course_id: i64,
        req: &ApprovalRequest,
    ) -> Result<Course> {
        if !auth.is_admin() {
            return Err(ApiError::Forbidden(
                "Only admins can approve or reject courses".to_string(),
            ));
        }

        if req.status == CourseStatus::Pending {
            return Err(ApiError::InvalidArgument("Invalid status value".to_string()));
        }

        let course = self.db.get_course(course_id).await?;

        let reason = match req.status {
            CourseStatus::Rejected => {
                let reason = req
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty());
                match reason {
                    Some(r) => Some(r),
                    None => {
                        return Err(ApiError::InvalidArgument(
                            "Rejection reason is required".to_string(),
                        ))
                    }
                }
            }
            _ => None,
        };

        self.db
            .set_course_status(
                course_id,
                req.status.as_str(),
                auth.user_id,
                &now_timestamp(),
                reason,
            )
            .await?;

        info!(
            course_id,
            admin_id = auth.user_id,
            status = %req.status,
            "Course approval decision recorded"
        );

        self.notify_trainer(&course.title, course.id, course.trainer_id, req.status, reason)
            .await;

        let row = self.db.get_course(course_id).await?;
        load_course(&self.db, row).await
    }

    async fn notify_trainer(
        &self,
        course_title: &str,
        course_id: i64,
        trainer_id: i64,
        status: CourseStatus,
        reason: Option<&str>,
    ) {
        let (kind, message) = match status {
            CourseStatus::Approved => (
                NotificationKind::CourseApproved,
                format!("Your course \"{}\" has been approved by admin", course_title),
            ),
            _ => (
                NotificationKind::CourseRejected,
                format!("Your course \"{}\" has been rejected by admin", course_title),
            ),
        };

        // Confirm the trainer still exists before writing into their inbox.
        if let Err(e) = self.db.get_user(trainer_id).await {
            warn!(trainer_id, error = %e, "Skipping approval notification, trainer missing");
            return;
        }

        match self
            .db
            .add_notification(
                trainer_id,
                kind.as_str(),
                &message,
                Some(course_id),
                Some(course_title),
                reason,
            )
            .await
        {
            Ok(id) => info!(notification_id = id, trainer_id, "Trainer notified"),
            Err(e) => warn!(trainer_id, error = %e, "Failed to store approval notification"),
        }
    }
}
