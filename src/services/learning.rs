//! Enrollment & Progress Tracker
//!
//! Owns the per-(user, course) learning state: the enrollment set, the
//! completed-lesson set, the derived progress percentage and certificate
//! eligibility. Progress records are created lazily on the first completion
//! event, not at enrollment time.

use tracing::info;

use crate::auth::AuthUser;
use crate::database::Database;
use crate::error::{ApiError, Result};
use crate::models::{
    CompleteLessonRequest, Course, CourseProgress, Eligibility, ProgressSummary, Role, User,
};
use crate::services::catalog::load_course;
use crate::services::now_timestamp;

/// Derived completion percentage. Zero lessons means zero percent, never a
/// division fault.
pub fn progress_percentage(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i64
}

#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
}

impl ProgressTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ========== Enrollment ==========

    /// Enroll a learner. Deliberately not idempotent: a repeat call is
    /// rejected with `AlreadyEnrolled` rather than silently ignored.
    pub async fn enroll(&self, auth: &AuthUser, course_id: i64) -> Result<Vec<i64>> {
        if auth.role != Role::Learner {
            return Err(ApiError::Forbidden(
                "Only learners can enroll in courses".to_string(),
            ));
        }

        self.db.get_course(course_id).await?;
        self.db.get_user(auth.user_id).await?;

        if self.db.is_enrolled(auth.user_id, course_id).await? {
            return Err(ApiError::AlreadyEnrolled);
        }

        self.db.add_enrollment(auth.user_id, course_id).await?;
        info!(user_id = auth.user_id, course_id, "Learner enrolled");

        let enrolled = self
            .db
            .list_enrolled_courses(auth.user_id)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        Ok(enrolled)
    }

    pub async fn enrolled_courses(&self, auth: &AuthUser) -> Result<Vec<Course>> {
        let rows = self.db.list_enrolled_courses(auth.user_id).await?;
        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(load_course(&self.db, row).await?);
        }
        Ok(courses)
    }

    // ========== Progress ==========

    /// Record a lesson completion and refresh the derived percentage.
    /// Re-marking an already completed lesson is a no-op at the set level.
    pub async fn mark_lesson_complete(
        &self,
        auth: &AuthUser,
        req: &CompleteLessonRequest,
    ) -> Result<ProgressSummary> {
        self.db.get_user(auth.user_id).await?;
        self.db.get_course(req.course_id).await?;

        let total_lessons = self.db.count_lessons(req.course_id).await?;

        self.db
            .add_completed_lesson(auth.user_id, req.course_id, req.lesson_id)
            .await?;

        let completed = self
            .db
            .count_completed_lessons(auth.user_id, req.course_id)
            .await?;
        let percentage = progress_percentage(completed, total_lessons);

        self.db
            .upsert_progress(
                auth.user_id,
                req.course_id,
                req.lesson_id,
                percentage,
                &now_timestamp(),
            )
            .await?;

        info!(
            user_id = auth.user_id,
            course_id = req.course_id,
            lesson_id = req.lesson_id,
            percentage,
            "Lesson marked complete"
        );

        Ok(ProgressSummary {
            completed_lessons: completed,
            total_lessons,
            progress_percentage: percentage,
        })
    }

    /// Read the stored progress record, or a zero-valued default when none
    /// exists yet. Reads never create a record.
    pub async fn course_progress(&self, auth: &AuthUser, course_id: i64) -> Result<CourseProgress> {
        self.db.get_user(auth.user_id).await?;

        let Some(record) = self.db.get_progress(auth.user_id, course_id).await? else {
            return Ok(CourseProgress::empty());
        };

        let completed = self
            .db
            .list_completed_lessons(auth.user_id, course_id)
            .await?;
        Ok(CourseProgress {
            total_completed: completed.len() as i64,
            completed_lessons: completed,
            progress_percentage: record.progress_percentage,
            last_accessed_lesson: record.last_accessed_lesson,
        })
    }

    // ========== Certificates ==========

    /// User-facing yes/no query: missing entities report ineligible with an
    /// explanatory reason instead of erroring.
    pub async fn check_eligibility(&self, auth: &AuthUser, course_id: i64) -> Result<Eligibility> {
        if self.db.get_user(auth.user_id).await.is_err() {
            return Ok(Eligibility {
                eligible: false,
                progress: 0,
                message: "User not found".to_string(),
            });
        }
        if self.db.get_course(course_id).await.is_err() {
            return Ok(Eligibility {
                eligible: false,
                progress: 0,
                message: "Course not found".to_string(),
            });
        }

        if !self.db.is_enrolled(auth.user_id, course_id).await? {
            return Ok(Eligibility {
                eligible: false,
                progress: 0,
                message: "Not enrolled".to_string(),
            });
        }

        let progress = self
            .db
            .get_progress(auth.user_id, course_id)
            .await?
            .map(|p| p.progress_percentage)
            .unwrap_or(0);
        let eligible = progress >= 100;

        Ok(Eligibility {
            eligible,
            progress,
            message: if eligible {
                "Certificate available!".to_string()
            } else {
                "Complete all lessons to unlock certificate".to_string()
            },
        })
    }

    /// Re-validates the eligibility rule at the moment of generation; a
    /// client-supplied eligibility flag is never trusted. Returns the learner
    /// display name and course title for the certificate template.
    pub async fn certificate_data(
        &self,
        auth: &AuthUser,
        course_id: i64,
    ) -> Result<(String, String)> {
        let user = User::from(self.db.get_user(auth.user_id).await?);
        let course = self.db.get_course(course_id).await?;

        if !self.db.is_enrolled(auth.user_id, course_id).await? {
            return Err(ApiError::PreconditionFailed(
                "You are not enrolled in this course".to_string(),
            ));
        }

        let progress = self
            .db
            .get_progress(auth.user_id, course_id)
            .await?
            .map(|p| p.progress_percentage)
            .unwrap_or(0);
        if progress < 100 {
            return Err(ApiError::PreconditionFailed(
                "Course not completed yet. Complete all lessons to get certificate".to_string(),
            ));
        }

        Ok((user.display_name().to_string(), course.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_zero_lessons_is_zero() {
        assert_eq!(progress_percentage(0, 0), 0);
        assert_eq!(progress_percentage(3, 0), 0);
    }

    #[test]
    fn test_percentage_quarters() {
        assert_eq!(progress_percentage(1, 4), 25);
        assert_eq!(progress_percentage(3, 4), 75);
        assert_eq!(progress_percentage(4, 4), 100);
    }

    #[test]
    fn test_percentage_rounds_to_nearest() {
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(1, 6), 17);
    }
}
