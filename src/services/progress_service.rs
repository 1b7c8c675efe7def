use crate::dto::progress_dto::{LearnerStatistics, LessonProgressUpdate};
use crate::error::{Error, Result};
use crate::models::progress::{CourseProgress, LessonProgress};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProgressService {
    pool: PgPool,
}

impl ProgressService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record learner activity on a lesson. The write is a single upsert on
    /// (user, lesson): supplied fields overwrite, omitted fields keep their
    /// stored value, and `last_activity` is always refreshed. Completing the
    /// lesson triggers a full recount of the owning course's progress.
    pub async fn record_lesson_activity(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        update: &LessonProgressUpdate,
    ) -> Result<LessonProgress> {
        let course_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT m.course_id
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(course_id) = course_id else {
            return Err(Error::NotFound("Lesson not found".to_string()));
        };

        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress (
                user_id, lesson_id, is_completed, time_spent,
                quiz_score, watched_video_time, last_position, last_activity
            )
            VALUES ($1, $2, COALESCE($3, FALSE), COALESCE($4, 0), $5, $6, $7, NOW())
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                is_completed = COALESCE($3, lesson_progress.is_completed),
                time_spent = COALESCE($4, lesson_progress.time_spent),
                quiz_score = COALESCE($5, lesson_progress.quiz_score),
                watched_video_time = COALESCE($6, lesson_progress.watched_video_time),
                last_position = COALESCE($7, lesson_progress.last_position),
                last_activity = NOW()
            RETURNING id, user_id, lesson_id, is_completed, time_spent,
                      quiz_score, watched_video_time, last_position, last_activity
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(update.is_completed)
        .bind(update.time_spent)
        .bind(update.quiz_score)
        .bind(update.watched_video_time)
        .bind(update.last_position)
        .fetch_one(&self.pool)
        .await?;

        if update.completes_lesson() {
            self.recompute_course_progress(user_id, course_id).await?;
        }

        Ok(progress)
    }

    pub async fn mark_lesson_completed(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<LessonProgress> {
        let update = LessonProgressUpdate {
            is_completed: Some(true),
            ..Default::default()
        };
        self.record_lesson_activity(user_id, lesson_id, &update)
            .await
    }

    /// Re-derive course completion from the full lesson set rather than
    /// nudging a counter; racing recomputations converge on the same value.
    /// `completed_at` is filled on the first transition to 100% and kept
    /// as-is from then on. Course time is the sum of the learner's lesson
    /// time within the course, recounted the same way.
    async fn recompute_course_progress(&self, user_id: Uuid, course_id: Uuid) -> Result<()> {
        let total_lessons: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        let (completed_lessons, time_spent): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE lp.is_completed),
                   COALESCE(SUM(lp.time_spent), 0)::BIGINT
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            JOIN course_modules m ON m.id = l.module_id
            WHERE lp.user_id = $1 AND m.course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        let progress = completion_percentage(completed_lessons, total_lessons);

        sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, course_id, progress, time_spent, last_activity, completed_at)
            VALUES ($1, $2, $3, $4, NOW(), CASE WHEN $3 >= 100.0 THEN NOW() END)
            ON CONFLICT (user_id, course_id) DO UPDATE SET
                progress = $3,
                time_spent = $4,
                last_activity = NOW(),
                completed_at = COALESCE(
                    user_progress.completed_at,
                    CASE WHEN $3 >= 100.0 THEN NOW() END
                )
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(progress)
        .bind(time_spent as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Return the learner's progress for a course, creating a zeroed row on
    /// first access. No explicit enroll step exists.
    pub async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<CourseProgress> {
        let course_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        if course_exists.is_none() {
            return Err(Error::NotFound("Course not found".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, course_id, progress, time_spent)
            VALUES ($1, $2, 0, 0)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&self.pool)
        .await?;

        let progress = sqlx::query_as::<_, CourseProgress>(
            r#"
            SELECT id, user_id, course_id, progress, time_spent,
                   current_lesson_id, completed_at, last_activity
            FROM user_progress
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(progress)
    }

    /// Read-side aggregation across all of the learner's courses.
    pub async fn get_statistics(&self, user_id: Uuid) -> Result<LearnerStatistics> {
        let (total_courses, completed_courses, total_lessons, completed_lessons, total_time) =
            futures::try_join!(
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_progress WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM user_progress WHERE user_id = $1 AND progress >= 100.0"
                )
                .bind(user_id)
                .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1"
                )
                .bind(user_id)
                .fetch_one(&self.pool),
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND is_completed"
                )
                .bind(user_id)
                .fetch_one(&self.pool),
                sqlx::query_scalar::<_, Option<i64>>(
                    "SELECT SUM(time_spent)::BIGINT FROM user_progress WHERE user_id = $1"
                )
                .bind(user_id)
                .fetch_one(&self.pool),
            )?;

        Ok(LearnerStatistics::from_counts(
            total_courses,
            completed_courses,
            total_lessons,
            completed_lessons,
            total_time.unwrap_or(0),
        ))
    }
}

pub fn completion_percentage(completed_lessons: i64, total_lessons: i64) -> f64 {
    if total_lessons <= 0 {
        0.0
    } else {
        (completed_lessons as f64 / total_lessons as f64) * 100.0
    }
}
