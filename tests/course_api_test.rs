use std::env;

use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use learnhub_backend::dto::course_dto::{
    CourseListQuery, CreateContentPayload, CreateCoursePayload, CreateLessonPayload,
    CreateModulePayload, UpdateCoursePayload,
};
use learnhub_backend::error::Error;
use learnhub_backend::models::course::{Quiz, QuizQuestion};
use learnhub_backend::AppState;

async fn setup() -> Option<(AppState, PgPool)> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    if env::var("JWT_SECRET").is_err() {
        env::set_var("JWT_SECRET", "test_secret_key");
    }
    if env::var("JWT_REFRESH_SECRET").is_err() {
        env::set_var("JWT_REFRESH_SECRET", "test_refresh_secret");
    }

    let _ = learnhub_backend::config::init_config();
    let pool = learnhub_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    Some((AppState::new(pool.clone()), pool))
}

async fn seed_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role, is_verified)
        VALUES ($1, $2, 'not-a-real-hash', 'Test', 'User', $3, TRUE)
        "#,
    )
    .bind(id)
    .bind(format!("user_{}@example.com", id))
    .bind(role)
    .execute(pool)
    .await
    .expect("seed user");
    id
}

fn quiz_course(title: &str) -> CreateCoursePayload {
    CreateCoursePayload {
        title: title.to_string(),
        description: "Two modules, three lessons, one quiz".to_string(),
        thumbnail: "thumb.png".to_string(),
        category: "programming".to_string(),
        level: "intermediate".to_string(),
        price: 49.99,
        modules: vec![
            CreateModulePayload {
                title: "Basics".to_string(),
                position: 0,
                lessons: vec![
                    CreateLessonPayload {
                        title: "Intro".to_string(),
                        position: 0,
                        duration: 10,
                        is_free: Some(true),
                        content: vec![CreateContentPayload {
                            content_type: "video".to_string(),
                            content: None,
                            url: Some("https://cdn.example.com/intro.mp4".to_string()),
                            duration: Some(600),
                            position: 0,
                            quiz: None,
                        }],
                    },
                    CreateLessonPayload {
                        title: "Setup".to_string(),
                        position: 1,
                        duration: 15,
                        is_free: None,
                        content: vec![CreateContentPayload {
                            content_type: "text".to_string(),
                            content: Some("Install the toolchain.".to_string()),
                            url: None,
                            duration: None,
                            position: 0,
                            quiz: None,
                        }],
                    },
                ],
            },
            quiz_module(),
        ],
    }
}

fn quiz_module() -> CreateModulePayload {
    CreateModulePayload {
        title: "Check Yourself".to_string(),
        position: 1,
        lessons: vec![CreateLessonPayload {
            title: "Final Quiz".to_string(),
            position: 0,
            duration: 20,
            is_free: None,
            content: vec![CreateContentPayload {
                content_type: "quiz".to_string(),
                content: None,
                url: None,
                duration: None,
                position: 0,
                quiz: Some(Quiz {
                    passing_score: 70,
                    questions: vec![
                        QuizQuestion::Single {
                            question: "2 + 2?".to_string(),
                            options: vec!["3".to_string(), "4".to_string()],
                            correct_answer: "4".to_string(),
                        },
                        QuizQuestion::Text {
                            question: "Name the language".to_string(),
                            correct_answer: "Rust".to_string(),
                        },
                    ],
                }),
            }],
        }],
    }
}

#[tokio::test]
#[serial]
async fn course_tree_roundtrips_and_navigates() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let author = seed_user(&pool, "teacher").await;
    let marker = Uuid::new_v4().to_string();
    let created = state
        .course_service
        .create(quiz_course(&format!("Course {}", marker)), author)
        .await
        .expect("create course");

    // Duration is derived from the lessons: 10 + 15 + 20.
    assert_eq!(created.course.duration, 45);
    assert_eq!(created.modules.len(), 2);
    assert_eq!(created.modules[0].lessons.len(), 2);

    let quiz_content = &created.modules[1].lessons[0].content[0];
    assert_eq!(quiz_content.content_type, "quiz");
    let quiz = quiz_content.quiz.as_ref().expect("quiz payload");
    assert_eq!(quiz.passing_score, 70);
    assert_eq!(quiz.questions.len(), 2);

    // Flattened order follows module then lesson positions, and the
    // detail view links neighbours accordingly.
    let lessons = state
        .course_service
        .list_lessons(created.course.id)
        .await
        .unwrap();
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["Intro", "Setup", "Final Quiz"]);

    let middle = state.course_service.get_lesson(lessons[1].id).await.unwrap();
    assert_eq!(middle.previous.as_ref().unwrap().title, "Intro");
    assert_eq!(middle.next.as_ref().unwrap().title, "Final Quiz");
    assert_eq!(middle.course_id, created.course.id);

    let first = state.course_service.get_lesson(lessons[0].id).await.unwrap();
    assert!(first.previous.is_none());
    let last = state.course_service.get_lesson(lessons[2].id).await.unwrap();
    assert!(last.next.is_none());
}

#[tokio::test]
#[serial]
async fn listing_shows_published_courses_with_aggregates() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let author = seed_user(&pool, "teacher").await;
    let learner = seed_user(&pool, "student").await;
    let marker = Uuid::new_v4().to_string();
    let created = state
        .course_service
        .create(quiz_course(&format!("Published {}", marker)), author)
        .await
        .unwrap();

    // Unpublished courses stay out of the listing.
    let query = CourseListQuery {
        search: Some(marker.clone()),
        ..Default::default()
    };
    let page = state.course_service.list(query.clone()).await.unwrap();
    assert_eq!(page.total, 0);

    state
        .course_service
        .publish(created.course.id, author)
        .await
        .unwrap();
    state
        .course_service
        .rate(created.course.id, learner, 4)
        .await
        .unwrap();
    state
        .progress_service
        .get_course_progress(learner, created.course.id)
        .await
        .unwrap();

    let page = state.course_service.list(query).await.unwrap();
    assert_eq!(page.total, 1);
    let summary = &page.items[0];
    assert_eq!(summary.id, created.course.id);
    assert_eq!(summary.average_rating, 4.0);
    assert_eq!(summary.total_students, 1);

    // Price filters exclude it.
    let expensive_only = CourseListQuery {
        search: Some(marker.clone()),
        min_price: Some(rust_decimal::Decimal::from(100)),
        ..Default::default()
    };
    let page = state.course_service.list(expensive_only).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[serial]
async fn only_the_author_may_modify_a_course() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let author = seed_user(&pool, "teacher").await;
    let other = seed_user(&pool, "teacher").await;
    let created = state
        .course_service
        .create(quiz_course("Ownership"), author)
        .await
        .unwrap();

    let rename = UpdateCoursePayload {
        title: Some("Hijacked".to_string()),
        description: None,
        thumbnail: None,
        category: None,
        level: None,
        price: None,
    };
    let denied = state
        .course_service
        .update(created.course.id, rename, other)
        .await;
    assert!(matches!(denied, Err(Error::Forbidden(_))));

    let denied = state.course_service.delete(created.course.id, other).await;
    assert!(matches!(denied, Err(Error::Forbidden(_))));

    // A partial update by the author keeps the untouched fields.
    let update = UpdateCoursePayload {
        title: Some("Renamed".to_string()),
        description: None,
        thumbnail: None,
        category: None,
        level: None,
        price: None,
    };
    let updated = state
        .course_service
        .update(created.course.id, update, author)
        .await
        .unwrap();
    assert_eq!(updated.course.title, "Renamed");
    assert_eq!(updated.course.level, "intermediate");

    // Publishing an empty course is rejected.
    let empty = CreateCoursePayload {
        title: "Empty".to_string(),
        description: "No modules yet".to_string(),
        thumbnail: "thumb.png".to_string(),
        category: "design".to_string(),
        level: "beginner".to_string(),
        price: 0.0,
        modules: vec![],
    };
    let empty_course = state.course_service.create(empty, author).await.unwrap();
    let denied = state
        .course_service
        .publish(empty_course.course.id, author)
        .await;
    assert!(matches!(denied, Err(Error::BadRequest(_))));
}
