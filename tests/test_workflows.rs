//! End-to-end workflow tests against a real (temp-file) SQLite database:
//! approval lifecycle, enrollment, progress derivation and certificates.

use learnhub::{
    ApiError, ApprovalRequest, ApprovalWorkflow, AuthUser, CompleteLessonRequest, Config,
    CourseCatalog, CourseLevel, CourseStatus, CreateCourseRequest, Database, LessonInput,
    MediaStore, NotificationKind, ProgressTracker, Role, SyllabusEntry,
};

struct TestApp {
    db: Database,
    catalog: CourseCatalog,
    workflow: ApprovalWorkflow,
    tracker: ProgressTracker,
}

async fn setup() -> TestApp {
    let run_id = uuid::Uuid::now_v7();
    let db_path = std::env::temp_dir().join(format!("learnhub-test-{}.db", run_id));
    let media_path = std::env::temp_dir().join(format!("learnhub-test-media-{}", run_id));

    let config = Config {
        database_url: db_path.to_str().unwrap().to_string(),
        media_base_path: media_path.to_str().unwrap().to_string(),
        ..Config::default()
    };

    let db = Database::new(&config.database_url).await.unwrap();
    TestApp {
        catalog: CourseCatalog::new(db.clone(), MediaStore::new(&config)),
        workflow: ApprovalWorkflow::new(db.clone()),
        tracker: ProgressTracker::new(db.clone()),
        db,
    }
}

async fn create_user(db: &Database, username: &str, role: Role) -> AuthUser {
    let email = format!("{}@example.com", username);
    let id = db
        .create_user(username, &email, None, role.as_str(), None)
        .await
        .unwrap();
    AuthUser { user_id: id, role }
}

fn course_request(lesson_count: usize) -> CreateCourseRequest {
    let lessons = (1..=lesson_count)
        .map(|i| LessonInput {
            title: format!("Lesson {}", i),
            description: format!("Covers part {}", i),
            order: Some(i as i64),
            video_url: Some(format!("/media/lesson_videos/lesson-{}.mp4", i)),
            image_url: None,
        })
        .collect();

    CreateCourseRequest {
        title: "Rust for Backend Engineers".into(),
        description: "From ownership to production services".into(),
        category: "Programming".into(),
        duration: Some(16),
        prerequisites: Some("Basic programming".into()),
        level: Some(CourseLevel::Intermediate),
        certification_available: true,
        thumbnail: Some("/media/course_thumbnails/rust-backend.png".into()),
        syllabus: vec![
            SyllabusEntry {
                title: "Week 1".into(),
                description: "Language fundamentals".into(),
            },
            SyllabusEntry {
                title: "Week 2".into(),
                description: "Services and persistence".into(),
            },
        ],
        lessons,
    }
}

#[tokio::test]
async fn test_course_creation_requires_trainer_role() {
    let app = setup().await;
    let learner = create_user(&app.db, "lea", Role::Learner).await;

    let err = app
        .catalog
        .create_course(&learner, &course_request(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn test_course_creation_validates_required_fields() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tara", Role::Trainer).await;

    let mut req = course_request(0);
    req.title = "".into();
    req.thumbnail = None;

    let err = app.catalog.create_course(&trainer, &req).await.unwrap_err();
    match err {
        ApiError::InvalidArgument(msg) => {
            assert!(msg.contains("title"));
            assert!(msg.contains("thumbnail"));
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
}

#[tokio::test]
async fn test_new_course_starts_pending_with_its_lessons() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tom", Role::Trainer).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(3))
        .await
        .unwrap();

    assert_eq!(course.status, CourseStatus::Pending);
    assert_eq!(course.lessons.len(), 3);
    assert_eq!(course.syllabus.len(), 2);
    assert_eq!(course.trainer_id, trainer.user_id);
    assert_eq!(course.lessons[0].order, 1);
}

#[tokio::test]
async fn test_pending_course_visibility() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tessa", Role::Trainer).await;
    let admin = create_user(&app.db, "ada", Role::Admin).await;
    let learner = create_user(&app.db, "luke", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    // Anonymous and unrelated callers are turned away.
    let err = app.catalog.get_course(None, course.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));
    let err = app
        .catalog
        .get_course(Some(learner), course.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    // The owning trainer and admins see it regardless of status.
    assert!(app.catalog.get_course(Some(trainer), course.id).await.is_ok());
    assert!(app.catalog.get_course(Some(admin), course.id).await.is_ok());
}

#[tokio::test]
async fn test_decide_requires_admin_and_reason_on_rejection() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tim", Role::Trainer).await;
    let admin = create_user(&app.db, "alice", Role::Admin).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    let reject = ApprovalRequest {
        status: CourseStatus::Rejected,
        rejection_reason: None,
    };
    let err = app
        .workflow
        .decide(&trainer, course.id, &reject)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = app
        .workflow
        .decide(&admin, course.id, &reject)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidArgument(_)));

    let err = app
        .workflow
        .decide(
            &admin,
            9999,
            &ApprovalRequest {
                status: CourseStatus::Approved,
                rejection_reason: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_rejection_stores_reason_and_notifies_trainer() {
    let app = setup().await;
    let trainer = create_user(&app.db, "trudy", Role::Trainer).await;
    let admin = create_user(&app.db, "aaron", Role::Admin).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    let rejected = app
        .workflow
        .decide(
            &admin,
            course.id,
            &ApprovalRequest {
                status: CourseStatus::Rejected,
                rejection_reason: Some("thumbnail missing".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(rejected.status, CourseStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("thumbnail missing"));
    assert_eq!(rejected.approved_by, Some(admin.user_id));
    assert!(rejected.approval_date.is_some());

    let notifications = app.db.list_notifications(trainer.user_id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::CourseRejected.as_str());
    assert_eq!(notifications[0].reason.as_deref(), Some("thumbnail missing"));
    assert_eq!(notifications[0].is_read, 0);

    // Re-approval is permitted and clears the prior reason.
    let approved = app
        .workflow
        .decide(
            &admin,
            course.id,
            &ApprovalRequest {
                status: CourseStatus::Approved,
                rejection_reason: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, CourseStatus::Approved);
    assert!(approved.rejection_reason.is_none());

    // Exactly one notification per decision.
    let notifications = app.db.list_notifications(trainer.user_id).await.unwrap();
    assert_eq!(notifications.len(), 2);
}

#[tokio::test]
async fn test_enrollment_is_rejecting_not_idempotent() {
    let app = setup().await;
    let trainer = create_user(&app.db, "theo", Role::Trainer).await;
    let learner = create_user(&app.db, "lena", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    let err = app.tracker.enroll(&trainer, course.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let enrolled = app.tracker.enroll(&learner, course.id).await.unwrap();
    assert_eq!(enrolled, vec![course.id]);
    assert_eq!(app.db.count_enrollments(learner.user_id).await.unwrap(), 1);

    let err = app.tracker.enroll(&learner, course.id).await.unwrap_err();
    assert!(matches!(err, ApiError::AlreadyEnrolled));
    assert_eq!(app.db.count_enrollments(learner.user_id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_progress_ladder_to_certificate() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tanya", Role::Trainer).await;
    let admin = create_user(&app.db, "amir", Role::Admin).await;
    let learner = create_user(&app.db, "liam", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(4))
        .await
        .unwrap();
    app.workflow
        .decide(
            &admin,
            course.id,
            &ApprovalRequest {
                status: CourseStatus::Approved,
                rejection_reason: None,
            },
        )
        .await
        .unwrap();
    app.tracker.enroll(&learner, course.id).await.unwrap();

    // No progress record exists before the first completion, and reading
    // progress does not create one.
    let progress = app
        .tracker
        .course_progress(&learner, course.id)
        .await
        .unwrap();
    assert_eq!(progress.progress_percentage, 0);
    assert!(app
        .db
        .get_progress(learner.user_id, course.id)
        .await
        .unwrap()
        .is_none());

    let lesson_ids: Vec<i64> = course.lessons.iter().map(|l| l.id).collect();
    let mark = |lesson_id| CompleteLessonRequest {
        course_id: course.id,
        lesson_id,
    };

    let summary = app
        .tracker
        .mark_lesson_complete(&learner, &mark(lesson_ids[0]))
        .await
        .unwrap();
    assert_eq!(summary.progress_percentage, 25);

    app.tracker
        .mark_lesson_complete(&learner, &mark(lesson_ids[1]))
        .await
        .unwrap();
    let summary = app
        .tracker
        .mark_lesson_complete(&learner, &mark(lesson_ids[2]))
        .await
        .unwrap();
    assert_eq!(summary.progress_percentage, 75);

    let eligibility = app
        .tracker
        .check_eligibility(&learner, course.id)
        .await
        .unwrap();
    assert!(!eligibility.eligible);
    let err = app
        .tracker
        .certificate_data(&learner, course.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PreconditionFailed(_)));

    let summary = app
        .tracker
        .mark_lesson_complete(&learner, &mark(lesson_ids[3]))
        .await
        .unwrap();
    assert_eq!(summary.progress_percentage, 100);
    assert_eq!(summary.completed_lessons, 4);
    assert_eq!(summary.total_lessons, 4);

    let eligibility = app
        .tracker
        .check_eligibility(&learner, course.id)
        .await
        .unwrap();
    assert!(eligibility.eligible);
    assert_eq!(eligibility.progress, 100);

    let (student, title) = app
        .tracker
        .certificate_data(&learner, course.id)
        .await
        .unwrap();
    assert_eq!(student, "liam");
    assert_eq!(title, course.title);
}

#[tokio::test]
async fn test_remarking_a_lesson_is_a_no_op() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tobias", Role::Trainer).await;
    let learner = create_user(&app.db, "lisa", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(2))
        .await
        .unwrap();
    let lesson_id = course.lessons[0].id;
    let req = CompleteLessonRequest {
        course_id: course.id,
        lesson_id,
    };

    let first = app.tracker.mark_lesson_complete(&learner, &req).await.unwrap();
    let second = app.tracker.mark_lesson_complete(&learner, &req).await.unwrap();

    assert_eq!(first.completed_lessons, 1);
    assert_eq!(second.completed_lessons, 1);
    assert_eq!(second.progress_percentage, 50);
}

#[tokio::test]
async fn test_certificate_requires_enrollment() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tilda", Role::Trainer).await;
    let learner = create_user(&app.db, "louis", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    let eligibility = app
        .tracker
        .check_eligibility(&learner, course.id)
        .await
        .unwrap();
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.message, "Not enrolled");

    let err = app
        .tracker
        .certificate_data(&learner, course.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::PreconditionFailed(_)));
}

#[tokio::test]
async fn test_deleting_a_course_removes_its_lessons() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tracy", Role::Trainer).await;
    let outsider = create_user(&app.db, "oscar", Role::Trainer).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(3))
        .await
        .unwrap();
    let lesson_ids: Vec<i64> = course.lessons.iter().map(|l| l.id).collect();

    let err = app
        .catalog
        .delete_course(&outsider, course.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    app.catalog.delete_course(&trainer, course.id).await.unwrap();

    assert!(matches!(
        app.catalog.get_course(Some(trainer), course.id).await.unwrap_err(),
        ApiError::NotFound(_)
    ));
    assert!(app.db.list_lessons(course.id).await.unwrap().is_empty());
    for lesson_id in lesson_ids {
        assert!(app.db.get_lesson(lesson_id).await.is_err());
    }
}

#[tokio::test]
async fn test_lesson_deletion_recomputes_percentages() {
    let app = setup().await;
    let trainer = create_user(&app.db, "ted", Role::Trainer).await;
    let learner = create_user(&app.db, "lara", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(2))
        .await
        .unwrap();
    let completed_lesson = course.lessons[0].id;

    app.tracker
        .mark_lesson_complete(
            &learner,
            &CompleteLessonRequest {
                course_id: course.id,
                lesson_id: completed_lesson,
            },
        )
        .await
        .unwrap();

    // Deleting the completed lesson drops it from the completed set and
    // refreshes the stored percentage against the new total.
    app.catalog.delete_lesson(&trainer, completed_lesson).await.unwrap();

    let progress = app
        .tracker
        .course_progress(&learner, course.id)
        .await
        .unwrap();
    assert!(progress.completed_lessons.is_empty());
    assert_eq!(progress.progress_percentage, 0);
}

#[tokio::test]
async fn test_adding_a_lesson_dilutes_stored_percentages() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tony", Role::Trainer).await;
    let learner = create_user(&app.db, "lucy", Role::Learner).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();

    app.tracker
        .mark_lesson_complete(
            &learner,
            &CompleteLessonRequest {
                course_id: course.id,
                lesson_id: course.lessons[0].id,
            },
        )
        .await
        .unwrap();

    app.catalog
        .add_lesson(
            &trainer,
            course.id,
            &LessonInput {
                title: "Bonus content".into(),
                description: "Extra material".into(),
                order: Some(2),
                video_url: None,
                image_url: Some("/media/lesson_images/bonus.png".into()),
            },
        )
        .await
        .unwrap();

    let progress = app
        .tracker
        .course_progress(&learner, course.id)
        .await
        .unwrap();
    assert_eq!(progress.progress_percentage, 50);
}

#[tokio::test]
async fn test_update_course_never_touches_lessons() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tess", Role::Trainer).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(3))
        .await
        .unwrap();

    let updated = app
        .catalog
        .update_course(
            &trainer,
            course.id,
            &learnhub::UpdateCourseRequest {
                title: Some("Rust for Backend Engineers, 2nd edition".into()),
                syllabus: Some(vec![SyllabusEntry {
                    title: "Week 1".into(),
                    description: "All of it".into(),
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Rust for Backend Engineers, 2nd edition");
    assert_eq!(updated.description, course.description);
    assert_eq!(updated.lessons.len(), 3);
    assert_eq!(updated.syllabus.len(), 1);
}

#[tokio::test]
async fn test_notification_read_flags_and_deletion() {
    let app = setup().await;
    let trainer = create_user(&app.db, "tavi", Role::Trainer).await;
    let admin = create_user(&app.db, "anne", Role::Admin).await;
    let other = create_user(&app.db, "olga", Role::Trainer).await;

    let course = app
        .catalog
        .create_course(&trainer, &course_request(1))
        .await
        .unwrap();
    app.workflow
        .decide(
            &admin,
            course.id,
            &ApprovalRequest {
                status: CourseStatus::Approved,
                rejection_reason: None,
            },
        )
        .await
        .unwrap();

    let notifications = app.db.list_notifications(trainer.user_id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    let id = notifications[0].id;

    // A different user cannot toggle or delete someone else's notification.
    assert!(app.db.mark_notification_read(other.user_id, id).await.is_err());
    assert!(app.db.delete_notification(other.user_id, id).await.is_err());

    app.db.mark_notification_read(trainer.user_id, id).await.unwrap();
    let notifications = app.db.list_notifications(trainer.user_id).await.unwrap();
    assert_eq!(notifications[0].is_read, 1);

    app.db.delete_notification(trainer.user_id, id).await.unwrap();
    assert!(app.db.list_notifications(trainer.user_id).await.unwrap().is_empty());
}
