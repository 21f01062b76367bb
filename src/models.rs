//! Domain Models
//!
//! Business entities for courses, lessons, enrollment, progress and
//! notifications. These are independent of the database layer; rows from
//! `database` are mapped into them via `From` impls.

use serde::{Deserialize, Serialize};

use crate::database::{CourseRow, LessonRow, NotificationRow, SyllabusRow, UserRow};

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Trainer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learner" => Ok(Role::Learner),
            "trainer" => Ok(Role::Trainer),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Course approval status. Starts at `Pending` on creation; only an
/// admin-authorized decision may move it. Re-transition between approved and
/// rejected is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Pending,
    Approved,
    Rejected,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Pending => "pending",
            CourseStatus::Approved => "approved",
            CourseStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CourseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CourseStatus::Pending),
            "approved" => Ok(CourseStatus::Approved),
            "rejected" => Ok(CourseStatus::Rejected),
            _ => Err(format!("Invalid course status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::Beginner => "Beginner",
            CourseLevel::Intermediate => "Intermediate",
            CourseLevel::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CourseLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "advanced" => Ok(CourseLevel::Advanced),
            _ => Err(format!("Invalid course level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CourseApproved,
    CourseRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::CourseApproved => "course_approved",
            NotificationKind::CourseRejected => "course_rejected",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "course_approved" => Ok(NotificationKind::CourseApproved),
            "course_rejected" => Ok(NotificationKind::CourseRejected),
            _ => Err(format!("Invalid notification kind: {}", s)),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = row.role.parse().unwrap_or(Role::Learner);
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            role,
            profile_picture: row.profile_picture,
            created_at: row.created_at,
        }
    }
}

impl User {
    /// Display name for user-facing output such as certificates.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusEntry {
    pub title: String,
    pub description: String,
}

impl From<SyllabusRow> for SyllabusEntry {
    fn from(row: SyllabusRow) -> Self {
        Self {
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub order: i64,
    pub created_at: String,
}

impl From<LessonRow> for Lesson {
    fn from(row: LessonRow) -> Self {
        Self {
            id: row.id,
            course_id: row.course_id,
            title: row.title,
            description: row.description,
            video_url: row.video_url,
            image_url: row.image_url,
            order: row.position,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub trainer_id: i64,
    pub thumbnail: String,
    pub duration: i64,
    pub prerequisites: Option<String>,
    pub level: CourseLevel,
    pub certification_available: bool,
    pub status: CourseStatus,
    pub approved_by: Option<i64>,
    pub approval_date: Option<String>,
    pub rejection_reason: Option<String>,
    pub syllabus: Vec<SyllabusEntry>,
    pub lessons: Vec<Lesson>,
    pub created_at: String,
}

impl Course {
    pub fn from_row(row: CourseRow, syllabus: Vec<SyllabusEntry>, lessons: Vec<Lesson>) -> Self {
        let level = row.level.parse().unwrap_or(CourseLevel::Beginner);
        let status = row.status.parse().unwrap_or(CourseStatus::Pending);
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            trainer_id: row.trainer_id,
            thumbnail: row.thumbnail,
            duration: row.duration,
            prerequisites: row.prerequisites,
            level,
            certification_available: row.certification_available != 0,
            status,
            approved_by: row.approved_by,
            approval_date: row.approval_date,
            rejection_reason: row.rejection_reason,
            syllabus,
            lessons,
            created_at: row.created_at,
        }
    }

    /// Read-path visibility: anonymous callers only see approved courses;
    /// the owning trainer and admins see any status.
    pub fn visible_to(&self, viewer: Option<(i64, Role)>) -> bool {
        if self.status == CourseStatus::Approved {
            return true;
        }
        match viewer {
            Some((_, Role::Admin)) => true,
            Some((user_id, _)) => user_id == self.trainer_id,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub course_id: Option<i64>,
    pub course_name: Option<String>,
    pub reason: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        let kind = row.kind.parse().unwrap_or(NotificationKind::CourseApproved);
        Self {
            id: row.id,
            kind,
            message: row.message,
            course_id: row.course_id,
            course_name: row.course_name,
            reason: row.reason,
            is_read: row.is_read != 0,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Request / response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub profile_picture: Option<String>,
}

/// Lesson payload supplied inline with course creation or standalone
/// lesson creation. Media is a single slot: video or image, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct LessonInput {
    pub title: String,
    pub description: String,
    pub order: Option<i64>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

impl LessonInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() || self.description.trim().is_empty() {
            return Err("Title and description are required".to_string());
        }
        if self.video_url.is_some() && self.image_url.is_some() {
            return Err("A lesson may carry a video or an image, not both".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub duration: Option<i64>,
    pub prerequisites: Option<String>,
    pub level: Option<CourseLevel>,
    #[serde(default)]
    pub certification_available: bool,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub syllabus: Vec<SyllabusEntry>,
    #[serde(default)]
    pub lessons: Vec<LessonInput>,
}

impl CreateCourseRequest {
    /// Presence check over the required fields, enumerating everything that
    /// is missing so the caller can fix the payload in one round trip.
    pub fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        if self.category.trim().is_empty() {
            missing.push("category");
        }
        if self.duration.is_none() {
            missing.push("duration");
        }
        if self.level.is_none() {
            missing.push("level");
        }
        if self.thumbnail.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push("thumbnail");
        }
        if !missing.is_empty() {
            return Err(format!("Missing required fields: {}", missing.join(", ")));
        }
        validate_syllabus(&self.syllabus)?;
        for lesson in &self.lessons {
            lesson.validate()?;
        }
        Ok(())
    }
}

pub fn validate_syllabus(entries: &[SyllabusEntry]) -> Result<(), String> {
    for entry in entries {
        if entry.title.trim().is_empty() || entry.description.trim().is_empty() {
            return Err("Each syllabus item must have a title and description".to_string());
        }
    }
    Ok(())
}

/// Partial course update. The lesson list is deliberately absent: lessons are
/// managed through their own endpoints so a partial payload can never wipe
/// them. Status and owning trainer are likewise not updatable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub duration: Option<i64>,
    pub prerequisites: Option<String>,
    pub level: Option<CourseLevel>,
    pub certification_available: Option<bool>,
    pub thumbnail: Option<String>,
    pub syllabus: Option<Vec<SyllabusEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub status: CourseStatus,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteLessonRequest {
    pub course_id: i64,
    pub lesson_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percentage: i64,
}

#[derive(Debug, Serialize)]
pub struct CourseProgress {
    pub completed_lessons: Vec<i64>,
    pub progress_percentage: i64,
    pub total_completed: i64,
    pub last_accessed_lesson: Option<i64>,
}

impl CourseProgress {
    /// Zero-valued default returned when no progress record exists yet.
    /// Reads never create one.
    pub fn empty() -> Self {
        Self {
            completed_lessons: Vec::new(),
            progress_percentage: 0,
            total_completed: 0,
            last_accessed_lesson: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub progress: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            CourseStatus::Pending,
            CourseStatus::Approved,
            CourseStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<CourseStatus>().unwrap(), status);
        }
        assert!("published".parse::<CourseStatus>().is_err());
    }

    #[test]
    fn test_level_parse_is_case_insensitive() {
        assert_eq!(
            "beginner".parse::<CourseLevel>().unwrap(),
            CourseLevel::Beginner
        );
        assert_eq!(
            "Advanced".parse::<CourseLevel>().unwrap(),
            CourseLevel::Advanced
        );
    }

    fn course_request() -> CreateCourseRequest {
        CreateCourseRequest {
            title: "Rust 101".into(),
            description: "Intro".into(),
            category: "Programming".into(),
            duration: Some(12),
            prerequisites: None,
            level: Some(CourseLevel::Beginner),
            certification_available: true,
            thumbnail: Some("https://cdn.example.com/course_thumbnails/rust101.png".into()),
            syllabus: vec![],
            lessons: vec![],
        }
    }

    #[test]
    fn test_create_course_validation_lists_missing_fields() {
        let mut req = course_request();
        req.title = "".into();
        req.duration = None;
        req.thumbnail = None;
        let err = req.validate().unwrap_err();
        assert!(err.contains("title"));
        assert!(err.contains("duration"));
        assert!(err.contains("thumbnail"));
        assert!(!err.contains("description"));
    }

    #[test]
    fn test_syllabus_entries_need_title_and_description() {
        let mut req = course_request();
        req.syllabus = vec![SyllabusEntry {
            title: "Week 1".into(),
            description: "".into(),
        }];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_lesson_media_slot_is_exclusive() {
        let lesson = LessonInput {
            title: "Intro".into(),
            description: "Welcome".into(),
            order: None,
            video_url: Some("https://cdn.example.com/lesson_videos/a.mp4".into()),
            image_url: Some("https://cdn.example.com/lesson_images/a.png".into()),
        };
        assert!(lesson.validate().is_err());
    }

    fn pending_course() -> Course {
        Course {
            id: 1,
            title: "Rust 101".into(),
            description: "Intro".into(),
            category: "Programming".into(),
            trainer_id: 7,
            thumbnail: "thumb".into(),
            duration: 12,
            prerequisites: None,
            level: CourseLevel::Beginner,
            certification_available: false,
            status: CourseStatus::Pending,
            approved_by: None,
            approval_date: None,
            rejection_reason: None,
            syllabus: vec![],
            lessons: vec![],
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn test_pending_course_hidden_from_anonymous_and_other_users() {
        let course = pending_course();
        assert!(!course.visible_to(None));
        assert!(!course.visible_to(Some((9, Role::Learner))));
        assert!(!course.visible_to(Some((9, Role::Trainer))));
    }

    #[test]
    fn test_pending_course_visible_to_owner_and_admin() {
        let course = pending_course();
        assert!(course.visible_to(Some((7, Role::Trainer))));
        assert!(course.visible_to(Some((3, Role::Admin))));
    }

    #[test]
    fn test_approved_course_visible_to_everyone() {
        let mut course = pending_course();
        course.status = CourseStatus::Approved;
        assert!(course.visible_to(None));
        assert!(course.visible_to(Some((9, Role::Learner))));
    }
}
