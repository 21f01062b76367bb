//! Course & Lesson Authoring
//!
//! Owns course and lesson lifecycle: creation bundles, partial updates,
//! cascading deletes and the media side effects that come with them. Course
//! visibility on the read path is decided here as well.
//!
//! Multi-row sequences (course + lessons creation, cascading delete) are
//! best-effort sequential, not transactional: a failure partway through is
//! surfaced to the caller but earlier writes stay in place.

use tracing::info;

use crate::auth::AuthUser;
use crate::database::{CourseFieldUpdates, CourseRow, Database, NewCourse};
use crate::error::{ApiError, Result};
use crate::models::{
    validate_syllabus, Course, CreateCourseRequest, Lesson, LessonInput, Role, SyllabusEntry,
    UpdateCourseRequest, UpdateLessonRequest,
};
use crate::services::learning::progress_percentage;
use crate::services::media::MediaStore;

/// Assemble a full course from its row plus the embedded syllabus and the
/// ordered lesson list.
pub(crate) async fn load_course(db: &Database, row: CourseRow) -> Result<Course> {
    let syllabus = db
        .list_syllabus(row.id)
        .await?
        .into_iter()
        .map(SyllabusEntry::from)
        .collect();
    let lessons = db
        .list_lessons(row.id)
        .await?
        .into_iter()
        .map(Lesson::from)
        .collect();
    Ok(Course::from_row(row, syllabus, lessons))
}

#[derive(Clone)]
pub struct CourseCatalog {
    db: Database,
    media: MediaStore,
}

impl CourseCatalog {
    pub fn new(db: Database, media: MediaStore) -> Self {
        Self { db, media }
    }

    // ========== Courses ==========

    /// Create a course (status starts at pending) together with its lesson
    /// bundle. All validation runs before the first write.
    pub async fn create_course(&self, auth: &AuthUser, req: &CreateCourseRequest) -> Result<Course> {
        if auth.role != Role::Trainer {
            return Err(ApiError::Forbidden(
                "Only trainers can create courses".to_string(),
            ));
        }

        req.validate().map_err(ApiError::InvalidArgument)?;

        let course_id = self
            .db
            .create_course(NewCourse {
                title: &req.title,
                description: &req.description,
                category: &req.category,
                trainer_id: auth.user_id,
                thumbnail: req.thumbnail.as_deref().unwrap_or_default(),
                duration: req.duration.unwrap_or_default(),
                prerequisites: req.prerequisites.as_deref(),
                level: req.level.map(|l| l.as_str()).unwrap_or_default(),
                certification_available: req.certification_available,
            })
            .await?;

        let entries: Vec<(String, String)> = req
            .syllabus
            .iter()
            .map(|s| (s.title.clone(), s.description.clone()))
            .collect();
        self.db.replace_syllabus(course_id, &entries).await?;

        for (index, lesson) in req.lessons.iter().enumerate() {
            let position = lesson.order.unwrap_or(index as i64 + 1);
            self.db
                .create_lesson(
                    course_id,
                    &lesson.title,
                    &lesson.description,
                    lesson.video_url.as_deref(),
                    lesson.image_url.as_deref(),
                    position,
                )
                .await?;
        }

        info!(
            course_id,
            trainer_id = auth.user_id,
            lessons = req.lessons.len(),
            "Course created, pending approval"
        );

        let row = self.db.get_course(course_id).await?;
        load_course(&self.db, row).await
    }

    /// Read path with the visibility rule applied: anonymous callers see only
    /// approved courses, the owning trainer and admins see any status.
    pub async fn get_course(&self, viewer: Option<AuthUser>, course_id: i64) -> Result<Course> {
        let row = self.db.get_course(course_id).await?;
        let course = load_course(&self.db, row).await?;

        if !course.visible_to(viewer.map(|v| (v.user_id, v.role))) {
            return Err(ApiError::Forbidden(
                "This course is not available".to_string(),
            ));
        }
        Ok(course)
    }

    pub async fn list_approved(&self) -> Result<Vec<Course>> {
        let rows = self.db.list_courses_by_status("approved").await?;
        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(load_course(&self.db, row).await?);
        }
        Ok(courses)
    }

    pub async fn list_pending(&self, auth: &AuthUser) -> Result<Vec<Course>> {
        if !auth.is_admin() {
            return Err(ApiError::Forbidden(
                "Only admins can view pending courses".to_string(),
            ));
        }
        let rows = self.db.list_courses_by_status("pending").await?;
        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(load_course(&self.db, row).await?);
        }
        Ok(courses)
    }

    /// A trainer's own approved courses, lessons included.
    pub async fn trainer_courses(&self, auth: &AuthUser) -> Result<Vec<Course>> {
        if auth.role != Role::Trainer {
            return Err(ApiError::Forbidden(
                "Only trainers can access their courses".to_string(),
            ));
        }
        let rows = self
            .db
            .list_trainer_courses(auth.user_id, "approved")
            .await?;
        let mut courses = Vec::with_capacity(rows.len());
        for row in rows {
            courses.push(load_course(&self.db, row).await?);
        }
        Ok(courses)
    }

    /// Partial content update by the owning trainer or an admin. The lesson
    /// list is never touched here; the syllabus, when supplied, is replaced
    /// wholesale after per-entry validation.
    pub async fn update_course(
        &self,
        auth: &AuthUser,
        course_id: i64,
        req: &UpdateCourseRequest,
    ) -> Result<Course> {
        let row = self.db.get_course(course_id).await?;
        if !auth.can_manage(row.trainer_id) {
            return Err(ApiError::Forbidden(
                "Unauthorized to update this course".to_string(),
            ));
        }

        if let Some(syllabus) = &req.syllabus {
            validate_syllabus(syllabus).map_err(ApiError::InvalidArgument)?;
        }

        let replacing_thumbnail = req
            .thumbnail
            .as_deref()
            .is_some_and(|t| !t.is_empty() && t != row.thumbnail);

        self.db
            .update_course_fields(
                course_id,
                CourseFieldUpdates {
                    title: req.title.as_deref(),
                    description: req.description.as_deref(),
                    category: req.category.as_deref(),
                    duration: req.duration,
                    prerequisites: req.prerequisites.as_deref(),
                    level: req.level.map(|l| l.as_str()),
                    certification_available: req.certification_available,
                    thumbnail: req.thumbnail.as_deref(),
                },
            )
            .await?;

        if let Some(syllabus) = &req.syllabus {
            let entries: Vec<(String, String)> = syllabus
                .iter()
                .map(|s| (s.title.clone(), s.description.clone()))
                .collect();
            self.db.replace_syllabus(course_id, &entries).await?;
        }

        if replacing_thumbnail {
            self.media.delete_best_effort(Some(&row.thumbnail)).await;
        }

        info!(course_id, user_id = auth.user_id, "Course updated");

        let row = self.db.get_course(course_id).await?;
        load_course(&self.db, row).await
    }

    /// Cascading delete: lessons (and their media, best-effort) go first so
    /// no lesson outlives its parent lookup path, then the course itself.
    pub async fn delete_course(&self, auth: &AuthUser, course_id: i64) -> Result<()> {
        let row = self.db.get_course(course_id).await?;
        if !auth.can_manage(row.trainer_id) {
            return Err(ApiError::Forbidden(
                "Unauthorized to delete this course".to_string(),
            ));
        }

        for lesson in self.db.list_lessons(course_id).await? {
            self.media
                .delete_best_effort(lesson.video_url.as_deref())
                .await;
            self.media
                .delete_best_effort(lesson.image_url.as_deref())
                .await;
            self.db.remove_lesson_completions(lesson.id).await?;
        }

        let removed = self.db.delete_lessons_by_course(course_id).await?;
        self.media.delete_best_effort(Some(&row.thumbnail)).await;
        self.db.delete_course(course_id).await?;

        info!(
            course_id,
            user_id = auth.user_id,
            lessons_removed = removed,
            "Course deleted"
        );
        Ok(())
    }

    // ========== Lessons ==========

    pub async fn add_lesson(
        &self,
        auth: &AuthUser,
        course_id: i64,
        input: &LessonInput,
    ) -> Result<Lesson> {
        input.validate().map_err(ApiError::InvalidArgument)?;

        let course = self.db.get_course(course_id).await?;
        if !auth.can_manage(course.trainer_id) {
            return Err(ApiError::Forbidden(
                "Unauthorized to add lessons to this course".to_string(),
            ));
        }

        let lesson_id = self
            .db
            .create_lesson(
                course_id,
                &input.title,
                &input.description,
                input.video_url.as_deref(),
                input.image_url.as_deref(),
                input.order.unwrap_or(1),
            )
            .await?;

        // The lesson count changed, so stored percentages are stale.
        self.recompute_percentages(course_id).await?;

        info!(lesson_id, course_id, "Lesson created");
        Ok(Lesson::from(self.db.get_lesson(lesson_id).await?))
    }

    pub async fn update_lesson(
        &self,
        auth: &AuthUser,
        lesson_id: i64,
        req: &UpdateLessonRequest,
    ) -> Result<Lesson> {
        let lesson = self.db.get_lesson(lesson_id).await?;
        let course = self.db.get_course(lesson.course_id).await?;
        if !auth.can_manage(course.trainer_id) {
            return Err(ApiError::Forbidden(
                "Unauthorized to update this lesson".to_string(),
            ));
        }

        if req.video_url.is_some() && req.image_url.is_some() {
            return Err(ApiError::InvalidArgument(
                "A lesson may carry a video or an image, not both".to_string(),
            ));
        }

        self.db
            .update_lesson(
                lesson_id,
                req.title.as_deref(),
                req.description.as_deref(),
                req.order,
            )
            .await?;

        // Media replace: the new upload takes the single slot, the previous
        // object (either kind) is released best-effort.
        if req.video_url.is_some() || req.image_url.is_some() {
            self.media
                .delete_best_effort(lesson.video_url.as_deref())
                .await;
            self.media
                .delete_best_effort(lesson.image_url.as_deref())
                .await;
            self.db
                .set_lesson_media(lesson_id, req.video_url.as_deref(), req.image_url.as_deref())
                .await?;
        }

        Ok(Lesson::from(self.db.get_lesson(lesson_id).await?))
    }

    pub async fn delete_lesson(&self, auth: &AuthUser, lesson_id: i64) -> Result<()> {
        let lesson = self.db.get_lesson(lesson_id).await?;
        let course = self.db.get_course(lesson.course_id).await?;
        if !auth.can_manage(course.trainer_id) {
            return Err(ApiError::Forbidden(
                "Unauthorized to delete this lesson".to_string(),
            ));
        }

        self.media
            .delete_best_effort(lesson.video_url.as_deref())
            .await;
        self.media
            .delete_best_effort(lesson.image_url.as_deref())
            .await;

        self.db.remove_lesson_completions(lesson_id).await?;
        self.db.delete_lesson(lesson_id).await?;
        self.recompute_percentages(lesson.course_id).await?;

        info!(lesson_id, course_id = lesson.course_id, "Lesson deleted");
        Ok(())
    }

    /// Refresh every stored percentage for a course after its lesson count
    /// changed. The derived value is never accepted from input.
    async fn recompute_percentages(&self, course_id: i64) -> Result<()> {
        let total = self.db.count_lessons(course_id).await?;
        for (user_id, completed) in self.db.list_course_progress_counts(course_id).await? {
            let percentage = progress_percentage(completed, total);
            self.db
                .set_progress_percentage(user_id, course_id, percentage)
                .await?;
        }
        Ok(())
    }
}
