//! Database Infrastructure Layer
//!
//! Handles database connection, schema initialization, and provides
//! data access methods for users, courses, lessons, enrollment, progress
//! and notifications.
//!
//! This layer is responsible ONLY for database concerns - no business logic.
//! The per-user collections (enrollments, progress, notifications) are kept
//! in independently keyed tables rather than one monolithic user record.

use std::{ops::Deref, str::FromStr};

use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use tracing::info;

#[derive(Debug)]
pub enum DatabaseError {
    Connection(sqlx::Error),
    Query(sqlx::Error),
    InvalidData(String),
    NotFound(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::Connection(err) => write!(f, "Database connection error: {}", err),
            DatabaseError::Query(err) => write!(f, "Database query error: {}", err),
            DatabaseError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::Connection(err) | DatabaseError::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::Query(err)
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Database row for users table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: String,
    pub profile_picture: Option<String>,
    pub created_at: String,
}

/// Database row for courses table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub trainer_id: i64,
    pub thumbnail: String,
    pub duration: i64,
    pub prerequisites: Option<String>,
    pub level: String,
    pub certification_available: i64,
    pub status: String,
    pub approved_by: Option<i64>,
    pub approval_date: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

/// Database row for syllabus entries (embedded value objects of a course)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyllabusRow {
    pub course_id: i64,
    pub position: i64,
    pub title: String,
    pub description: String,
}

/// Database row for lessons table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LessonRow {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub image_url: Option<String>,
    pub position: i64,
    pub created_at: String,
}

/// Database row for per-(user, course) progress records
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProgressRow {
    pub user_id: i64,
    pub course_id: i64,
    pub last_accessed_lesson: Option<i64>,
    pub progress_percentage: i64,
    pub last_accessed: String,
}

/// Database row for notifications table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub message: String,
    pub course_id: Option<i64>,
    pub course_name: Option<String>,
    pub reason: Option<String>,
    pub is_read: i64,
    pub created_at: String,
}

pub struct NewCourse<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub trainer_id: i64,
    pub thumbnail: &'a str,
    pub duration: i64,
    pub prerequisites: Option<&'a str>,
    pub level: &'a str,
    pub certification_available: bool,
}

pub struct CourseFieldUpdates<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub duration: Option<i64>,
    pub prerequisites: Option<&'a str>,
    pub level: Option<&'a str>,
    pub certification_available: Option<bool>,
    pub thumbnail: Option<&'a str>,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Deref for Database {
    type Target = SqlitePool;
    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let database_config = SqliteConnectOptions::from_str(database_url)
            .map_err(DatabaseError::Connection)?
            .create_if_missing(true);

        let pool = SqlitePool::connect_lazy_with(database_config);

        let db = Self { pool };
        db.initialize_tables().await?;

        info!("Database initialized at {}", database_url);
        Ok(db)
    }

    async fn initialize_tables(&self) -> Result<()> {
        // Users table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT,
                role TEXT NOT NULL,
                profile_picture TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Courses table. Status tracks the approval lifecycle
        // (pending, approved, rejected); the trainer reference is immutable.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                trainer_id INTEGER NOT NULL,
                thumbnail TEXT NOT NULL,
                duration INTEGER NOT NULL,
                prerequisites TEXT,
                level TEXT NOT NULL,
                certification_available INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                approved_by INTEGER,
                approval_date TEXT,
                rejection_reason TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (trainer_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Syllabus entries have no identity of their own; they are replaced
        // wholesale whenever a course's syllabus is updated.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS syllabus_entries (
                course_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                PRIMARY KEY (course_id, position),
                FOREIGN KEY (course_id) REFERENCES courses(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Lessons table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lessons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                video_url TEXT,
                image_url TEXT,
                position INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (course_id) REFERENCES courses(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Enrollment set. The composite primary key is what makes a second
        // enrollment attempt detectable.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS enrollments (
                user_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, course_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (course_id) REFERENCES courses(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Per-(user, course) progress record. progress_percentage is derived;
        // it is only ever written by recomputation, never accepted from input.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS course_progress (
                user_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                last_accessed_lesson INTEGER,
                progress_percentage INTEGER NOT NULL DEFAULT 0,
                last_accessed TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, course_id),
                FOREIGN KEY (user_id) REFERENCES users(id),
                FOREIGN KEY (course_id) REFERENCES courses(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Completed-lesson set; the primary key gives set semantics.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS completed_lessons (
                user_id INTEGER NOT NULL,
                course_id INTEGER NOT NULL,
                lesson_id INTEGER NOT NULL,
                PRIMARY KEY (user_id, course_id, lesson_id),
                FOREIGN KEY (lesson_id) REFERENCES lessons(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Notifications (persisted per-user inbox)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                course_id INTEGER,
                course_name TEXT,
                reason TEXT,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes for performance
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_trainer_id ON courses(trainer_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_status ON courses(status)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_lessons_course_id ON lessons(course_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_notifications_user_id ON notifications(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========== User Operations ==========

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        full_name: Option<&str>,
        role: &str,
        profile_picture: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, full_name, role, profile_picture)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(full_name)
        .bind(role)
        .bind(profile_picture)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_user(&self, id: i64) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, role, profile_picture, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("User not found".to_string()),
            e => DatabaseError::Query(e),
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserRow>> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, role, profile_picture, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    // ========== Course Operations ==========

    pub async fn create_course(&self, course: NewCourse<'_>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO courses (
                title, description, category, trainer_id, thumbnail,
                duration, prerequisites, level, certification_available, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(course.title)
        .bind(course.description)
        .bind(course.category)
        .bind(course.trainer_id)
        .bind(course.thumbnail)
        .bind(course.duration)
        .bind(course.prerequisites)
        .bind(course.level)
        .bind(course.certification_available as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_course(&self, id: i64) -> Result<CourseRow> {
        sqlx::query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    DatabaseError::NotFound("Course not found".to_string())
                }
                e => DatabaseError::Query(e),
            })
    }

    pub async fn list_courses_by_status(&self, status: &str) -> Result<Vec<CourseRow>> {
        sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT * FROM courses
            WHERE status = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn list_trainer_courses(&self, trainer_id: i64, status: &str) -> Result<Vec<CourseRow>> {
        sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT * FROM courses
            WHERE trainer_id = ? AND status = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(trainer_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    /// Partial field merge. Absent fields keep their stored value. The lesson
    /// list, status and trainer reference are not reachable from here.
    pub async fn update_course_fields(
        &self,
        id: i64,
        updates: CourseFieldUpdates<'_>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE courses SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                category = COALESCE(?, category),
                duration = COALESCE(?, duration),
                prerequisites = COALESCE(?, prerequisites),
                level = COALESCE(?, level),
                certification_available = COALESCE(?, certification_available),
                thumbnail = COALESCE(?, thumbnail)
            WHERE id = ?
            "#,
        )
        .bind(updates.title)
        .bind(updates.description)
        .bind(updates.category)
        .bind(updates.duration)
        .bind(updates.prerequisites)
        .bind(updates.level)
        .bind(updates.certification_available.map(|b| b as i64))
        .bind(updates.thumbnail)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records an approval decision: status, approver, timestamp. The reason
    /// is stored on rejection and cleared on approval.
    pub async fn set_course_status(
        &self,
        id: i64,
        status: &str,
        approved_by: i64,
        approval_date: &str,
        rejection_reason: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET status = ?, approved_by = ?, approval_date = ?, rejection_reason = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(approved_by)
        .bind(approval_date)
        .bind(rejection_reason)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Course not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_course(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM syllabus_entries WHERE course_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ========== Syllabus Operations ==========

    /// Full replacement: the previous syllabus is dropped and the supplied
    /// entries written in order.
    pub async fn replace_syllabus(
        &self,
        course_id: i64,
        entries: &[(String, String)],
    ) -> Result<()> {
        sqlx::query("DELETE FROM syllabus_entries WHERE course_id = ?")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        for (position, (title, description)) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO syllabus_entries (course_id, position, title, description)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(course_id)
            .bind(position as i64)
            .bind(title)
            .bind(description)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    pub async fn list_syllabus(&self, course_id: i64) -> Result<Vec<SyllabusRow>> {
        sqlx::query_as::<_, SyllabusRow>(
            r#"
            SELECT course_id, position, title, description
            FROM syllabus_entries
            WHERE course_id = ?
            ORDER BY position
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    // ========== Lesson Operations ==========

    pub async fn create_lesson(
        &self,
        course_id: i64,
        title: &str,
        description: &str,
        video_url: Option<&str>,
        image_url: Option<&str>,
        position: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO lessons (course_id, title, description, video_url, image_url, position)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(course_id)
        .bind(title)
        .bind(description)
        .bind(video_url)
        .bind(image_url)
        .bind(position)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_lesson(&self, id: i64) -> Result<LessonRow> {
        sqlx::query_as::<_, LessonRow>("SELECT * FROM lessons WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    DatabaseError::NotFound("Lesson not found".to_string())
                }
                e => DatabaseError::Query(e),
            })
    }

    pub async fn list_lessons(&self, course_id: i64) -> Result<Vec<LessonRow>> {
        sqlx::query_as::<_, LessonRow>(
            r#"
            SELECT * FROM lessons
            WHERE course_id = ?
            ORDER BY position, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn count_lessons(&self, course_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM lessons WHERE course_id = ?")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn update_lesson(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
        position: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE lessons SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                position = COALESCE(?, position)
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(position)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Writes both media slots at once so they stay mutually exclusive.
    pub async fn set_lesson_media(
        &self,
        id: i64,
        video_url: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE lessons SET video_url = ?, image_url = ? WHERE id = ?")
            .bind(video_url)
            .bind(image_url)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_lesson(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM lessons WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn delete_lessons_by_course(&self, course_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM lessons WHERE course_id = ?")
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // ========== Enrollment Operations ==========

    pub async fn is_enrolled(&self, user_id: i64, course_id: i64) -> Result<bool> {
        let (exists,): (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = ? AND course_id = ?)",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists != 0)
    }

    pub async fn add_enrollment(&self, user_id: i64, course_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO enrollments (user_id, course_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_enrolled_courses(&self, user_id: i64) -> Result<Vec<CourseRow>> {
        sqlx::query_as::<_, CourseRow>(
            r#"
            SELECT c.* FROM courses c
            JOIN enrollments e ON e.course_id = c.id
            WHERE e.user_id = ?
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn count_enrollments(&self, user_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM enrollments WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    // ========== Progress Operations ==========

    pub async fn get_progress(&self, user_id: i64, course_id: i64) -> Result<Option<ProgressRow>> {
        sqlx::query_as::<_, ProgressRow>(
            "SELECT * FROM course_progress WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    /// Lazily creates the progress record on first write; the stored
    /// percentage is always supplied by the caller's recomputation.
    pub async fn upsert_progress(
        &self,
        user_id: i64,
        course_id: i64,
        last_accessed_lesson: i64,
        progress_percentage: i64,
        last_accessed: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_progress
                (user_id, course_id, last_accessed_lesson, progress_percentage, last_accessed)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                last_accessed_lesson = excluded.last_accessed_lesson,
                progress_percentage = excluded.progress_percentage,
                last_accessed = excluded.last_accessed
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(last_accessed_lesson)
        .bind(progress_percentage)
        .bind(last_accessed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_progress_percentage(
        &self,
        user_id: i64,
        course_id: i64,
        progress_percentage: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE course_progress
            SET progress_percentage = ?
            WHERE user_id = ? AND course_id = ?
            "#,
        )
        .bind(progress_percentage)
        .bind(user_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn add_completed_lesson(
        &self,
        user_id: i64,
        course_id: i64,
        lesson_id: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO completed_lessons (user_id, course_id, lesson_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(lesson_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_completed_lessons(&self, user_id: i64, course_id: i64) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT lesson_id FROM completed_lessons
            WHERE user_id = ? AND course_id = ?
            ORDER BY lesson_id
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn count_completed_lessons(&self, user_id: i64, course_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM completed_lessons WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Drops a deleted lesson from every user's completed set.
    pub async fn remove_lesson_completions(&self, lesson_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM completed_lessons WHERE lesson_id = ?")
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Every progress record for a course together with its current completed
    /// count, for percentage recomputation when the lesson count changes.
    pub async fn list_course_progress_counts(&self, course_id: i64) -> Result<Vec<(i64, i64)>> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT cp.user_id, COUNT(cl.lesson_id)
            FROM course_progress cp
            LEFT JOIN completed_lessons cl
                ON cl.user_id = cp.user_id AND cl.course_id = cp.course_id
            WHERE cp.course_id = ?
            GROUP BY cp.user_id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    // ========== Notification Operations ==========

    pub async fn add_notification(
        &self,
        user_id: i64,
        kind: &str,
        message: &str,
        course_id: Option<i64>,
        course_name: Option<&str>,
        reason: Option<&str>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, message, course_id, course_name, reason)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(course_id)
        .bind(course_name)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn list_notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    pub async fn mark_notification_read(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self, user_id: i64) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_notification(&self, user_id: i64, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}
