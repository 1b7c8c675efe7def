use std::env;

use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use learnhub_backend::dto::course_dto::{
    CreateContentPayload, CreateCoursePayload, CreateLessonPayload, CreateModulePayload,
};
use learnhub_backend::dto::progress_dto::LessonProgressUpdate;
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

async fn seed_achievement(pool: &PgPool, name: &str, rule: serde_json::Value, points: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO achievements (id, name, description, icon, rule, points)
        VALUES ($1, $2, 'seeded by tests', 'star', $3, $4)
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(rule)
    .bind(points)
    .execute(pool)
    .await
    .expect("seed achievement");
    id
}

fn flat_course(lesson_count: usize) -> CreateCoursePayload {
    CreateCoursePayload {
        title: "Achievement Fixtures".to_string(),
        description: "Course used by the achievement tests".to_string(),
        thumbnail: "thumb.png".to_string(),
        category: "programming".to_string(),
        level: "beginner".to_string(),
        price: 0.0,
        modules: vec![CreateModulePayload {
            title: "Only Module".to_string(),
            position: 0,
            lessons: (0..lesson_count)
                .map(|idx| CreateLessonPayload {
                    title: format!("Lesson {}", idx + 1),
                    position: idx as i32,
                    duration: 5,
                    is_free: None,
                    content: vec![CreateContentPayload {
                        content_type: "text".to_string(),
                        content: Some("body".to_string()),
                        url: None,
                        duration: None,
                        position: 0,
                        quiz: None,
                    }],
                })
                .collect(),
        }],
    }
}

#[tokio::test]
#[serial]
async fn lessons_completed_awards_once_at_threshold() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let marker = Uuid::new_v4();
    let achievement_name = format!("Five Lessons {}", marker);
    let achievement_id = seed_achievement(
        &pool,
        &achievement_name,
        serde_json::json!({ "type": "lessons_completed", "count": 5 }),
        10,
    )
    .await;

    let teacher = seed_user(&pool, "teacher").await;
    let learner = seed_user(&pool, "student").await;
    let course = state
        .course_service
        .create(flat_course(6), teacher)
        .await
        .expect("create course");
    let lessons = state
        .course_service
        .list_lessons(course.course.id)
        .await
        .expect("list lessons");

    // Four completions are not enough.
    for lesson in &lessons[..4] {
        state
            .progress_service
            .mark_lesson_completed(learner, lesson.id)
            .await
            .unwrap();
    }
    let awarded = state.achievement_service.evaluate(learner).await.unwrap();
    assert!(!awarded.iter().any(|a| a.id == achievement_id));

    // The fifth distinct lesson crosses the threshold.
    state
        .progress_service
        .mark_lesson_completed(learner, lessons[4].id)
        .await
        .unwrap();
    let awarded = state.achievement_service.evaluate(learner).await.unwrap();
    assert!(awarded.iter().any(|a| a.id == achievement_id));

    // A second pass with no new activity awards nothing at all.
    let repeat = state.achievement_service.evaluate(learner).await.unwrap();
    assert!(repeat.is_empty());

    // Points reflect everything earned so far, and the earned set is
    // consistent with the points summary.
    let earned = state
        .achievement_service
        .get_user_achievements(learner)
        .await
        .unwrap();
    let points = state
        .achievement_service
        .get_user_points(learner)
        .await
        .unwrap();
    let expected: i64 = earned.iter().map(|e| e.achievement.points as i64).sum();
    assert_eq!(points.total_points, expected);
    assert_eq!(points.achievements_count, earned.len() as i64);
    assert!(earned.iter().any(|e| e.achievement.id == achievement_id));
    assert!(earned.iter().all(|e| e.progress == 100));
}

#[tokio::test]
#[serial]
async fn perfect_quiz_requires_a_hundred() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let marker = Uuid::new_v4();
    let achievement_id = seed_achievement(
        &pool,
        &format!("Flawless {}", marker),
        serde_json::json!({ "type": "perfect_quiz", "count": 1 }),
        20,
    )
    .await;

    let teacher = seed_user(&pool, "teacher").await;
    let almost = seed_user(&pool, "student").await;
    let perfect = seed_user(&pool, "student").await;
    let course = state
        .course_service
        .create(flat_course(1), teacher)
        .await
        .expect("create course");
    let lesson_id = state
        .course_service
        .list_lessons(course.course.id)
        .await
        .unwrap()[0]
        .id;

    let score = |value: i32| LessonProgressUpdate {
        quiz_score: Some(value),
        ..Default::default()
    };

    // 99 never qualifies, no matter how often the evaluator runs.
    state
        .progress_service
        .record_lesson_activity(almost, lesson_id, &score(99))
        .await
        .unwrap();
    for _ in 0..3 {
        let awarded = state.achievement_service.evaluate(almost).await.unwrap();
        assert!(!awarded.iter().any(|a| a.id == achievement_id));
    }

    state
        .progress_service
        .record_lesson_activity(perfect, lesson_id, &score(100))
        .await
        .unwrap();
    let awarded = state.achievement_service.evaluate(perfect).await.unwrap();
    assert!(awarded.iter().any(|a| a.id == achievement_id));
}

#[tokio::test]
#[serial]
async fn awards_are_monotone_and_missing_learners_get_none() {
    let Some((state, pool)) = setup().await else {
        return;
    };

    let teacher = seed_user(&pool, "teacher").await;
    let learner = seed_user(&pool, "student").await;
    let course = state
        .course_service
        .create(flat_course(2), teacher)
        .await
        .expect("create course");
    for lesson in state
        .course_service
        .list_lessons(course.course.id)
        .await
        .unwrap()
    {
        state
            .progress_service
            .mark_lesson_completed(learner, lesson.id)
            .await
            .unwrap();
    }

    state.achievement_service.evaluate(learner).await.unwrap();
    let before = state
        .achievement_service
        .get_user_achievements(learner)
        .await
        .unwrap()
        .len();
    assert!(before > 0);

    // Repeated evaluation never shrinks the earned set.
    for _ in 0..3 {
        state.achievement_service.evaluate(learner).await.unwrap();
    }
    let after = state
        .achievement_service
        .get_user_achievements(learner)
        .await
        .unwrap()
        .len();
    assert_eq!(before, after);

    // The login-streak entry from the catalog never fires.
    let earned = state
        .achievement_service
        .get_user_achievements(learner)
        .await
        .unwrap();
    assert!(earned
        .iter()
        .all(|e| e.achievement.name != "Creature of Habit"));

    // An unknown learner aggregates to nothing instead of failing.
    let ghost = Uuid::new_v4();
    assert!(state
        .achievement_service
        .evaluate(ghost)
        .await
        .unwrap()
        .is_empty());
    let points = state.achievement_service.get_user_points(ghost).await.unwrap();
    assert_eq!(points.total_points, 0);
    assert_eq!(points.achievements_count, 0);
}
