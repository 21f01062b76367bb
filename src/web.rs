//! HTTP API
//!
//! JSON-in/JSON-out handlers over the domain services, plus the HTML
//! certificate endpoint. Status codes follow conventional REST mapping:
//! 403 authorization, 404 missing entity, 400 validation, 200/201 success.

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::info;

use crate::{
    auth::{AuthUser, MaybeAuthUser},
    config::Config,
    database::Database,
    error::ApiError,
    models::{
        ApprovalRequest, CompleteLessonRequest, CreateCourseRequest, CreateUserRequest,
        LessonInput, Notification, UpdateCourseRequest, UpdateLessonRequest, User,
    },
    services::{ApprovalWorkflow, CourseCatalog, MediaStore, ProgressTracker},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: CourseCatalog,
    pub workflow: ApprovalWorkflow,
    pub tracker: ProgressTracker,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let media = MediaStore::new(config);
        Self {
            catalog: CourseCatalog::new(db.clone(), media),
            workflow: ApprovalWorkflow::new(db.clone()),
            tracker: ProgressTracker::new(db.clone()),
            db,
        }
    }
}

// Template rendering helper
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => {
                tracing::error!("Template error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Template error: {}", err),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "certificate.html")]
struct CertificateTemplate {
    student_name: String,
    course_title: String,
    issued_on: String,
}

// ========== User Handlers ==========

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "Missing required fields: username, email".to_string(),
        ));
    }

    let id = state
        .db
        .create_user(
            &req.username,
            &req.email,
            req.full_name.as_deref(),
            req.role.as_str(),
            req.profile_picture.as_deref(),
        )
        .await?;

    info!(user_id = id, username = req.username, role = %req.role, "User created");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    if !auth.is_admin() {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    let users = state
        .db
        .list_users()
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    if !auth.is_admin() && auth.user_id != id {
        return Err(ApiError::Forbidden("Access denied".to_string()));
    }
    Ok(Json(User::from(state.db.get_user(id).await?)))
}

async fn current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(User::from(state.db.get_user(auth.user_id).await?)))
}

// ========== Course Handlers ==========

async fn create_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.create_course(&auth, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Course created successfully",
            "course": course,
        })),
    ))
}

async fn list_courses(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.list_approved().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "All approved courses fetched successfully",
        "courses": courses,
    })))
}

async fn pending_courses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.list_pending(&auth).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "courses": courses }),
    ))
}

async fn trainer_courses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.catalog.trainer_courses(&auth).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "courses": courses }),
    ))
}

async fn get_course(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.get_course(viewer, id).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "course": course }),
    ))
}

async fn update_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.catalog.update_course(&auth, id, &req).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Course updated successfully",
        "course": course,
    })))
}

async fn delete_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_course(&auth, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Course deleted successfully",
    })))
}

async fn decide_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<ApprovalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = state.workflow.decide(&auth, id, &req).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Course {} successfully", course.status),
        "course": course,
    })))
}

// ========== Lesson Handlers ==========

async fn add_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
    Json(req): Json<LessonInput>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson = state.catalog.add_lesson(&auth, course_id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Lesson created successfully",
            "lesson": lesson,
        })),
    ))
}

async fn update_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLessonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson = state.catalog.update_lesson(&auth, id, &req).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "lesson": lesson }),
    ))
}

async fn delete_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.catalog.delete_lesson(&auth, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Lesson deleted successfully",
    })))
}

// ========== Enrollment & Progress Handlers ==========

async fn enroll(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let enrolled = state.tracker.enroll(&auth, course_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Enrolled in course successfully",
        "enrolledCourses": enrolled,
    })))
}

async fn enrolled_courses(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let courses = state.tracker.enrolled_courses(&auth).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Enrolled courses fetched successfully",
        "enrolledCourses": courses,
    })))
}

async fn complete_lesson(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CompleteLessonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.tracker.mark_lesson_complete(&auth, &req).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Lesson marked as complete",
        "progress": progress,
    })))
}

async fn course_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state.tracker.course_progress(&auth, course_id).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "progress": progress }),
    ))
}

// ========== Certificate Handlers ==========

async fn certificate_eligibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let eligibility = state.tracker.check_eligibility(&auth, course_id).await?;
    Ok(Json(eligibility))
}

async fn generate_certificate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let (student_name, course_title) = state.tracker.certificate_data(&auth, course_id).await?;

    info!(
        user_id = auth.user_id,
        course_id, "Certificate generated"
    );

    Ok(HtmlTemplate(CertificateTemplate {
        student_name,
        course_title,
        issued_on: chrono::Utc::now().format("%B %e, %Y").to_string(),
    }))
}

// ========== Notification Handlers ==========

async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let notifications: Vec<Notification> = state
        .db
        .list_notifications(auth.user_id)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();
    Ok(Json(serde_json::json!({
        "success": true,
        "notifications": notifications,
    })))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.mark_notification_read(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Notification marked as read",
    })))
}

async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.db.mark_all_notifications_read(auth.user_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "All notifications marked as read",
    })))
}

async fn delete_notification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_notification(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Notification deleted",
    })))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/users", post(create_user).get(list_users))
        .route("/users/me", get(current_user))
        .route("/users/{id}", get(get_user))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/pending", get(pending_courses))
        .route("/courses/mine", get(trainer_courses))
        .route("/courses/enrolled", get(enrolled_courses))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/{id}/approval", put(decide_course))
        .route("/courses/{id}/lessons", post(add_lesson))
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/progress", get(course_progress))
        .route("/lessons/{id}", put(update_lesson).delete(delete_lesson))
        .route("/progress/complete", post(complete_lesson))
        .route(
            "/certificates/{course_id}/eligibility",
            get(certificate_eligibility),
        )
        .route("/certificates/{course_id}", get(generate_certificate))
        .route(
            "/notifications",
            get(list_notifications),
        )
        .route("/notifications/read-all", put(mark_all_notifications_read))
        .route(
            "/notifications/{id}/read",
            put(mark_notification_read),
        )
        .route("/notifications/{id}", delete(delete_notification))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_template_renders_names() {
        let html = CertificateTemplate {
            student_name: "Ada Lovelace".to_string(),
            course_title: "Analytical Engines".to_string(),
            issued_on: "March 1, 2024".to_string(),
        }
        .render()
        .unwrap();

        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("Analytical Engines"));
    }
}
