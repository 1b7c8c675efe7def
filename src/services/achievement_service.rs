use crate::dto::achievement_dto::{EarnedAchievement, UserPoints};
use crate::error::Result;
use crate::models::achievement::{Achievement, AchievementRule, ProgressSnapshot};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Clone)]
pub struct AchievementService {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct EarnedRow {
    id: Uuid,
    name: String,
    description: String,
    icon: String,
    rule: Json<AchievementRule>,
    points: i32,
    created_at: DateTime<Utc>,
    earned_at: DateTime<Utc>,
    earned_progress: i32,
}

impl AchievementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the learner's aggregate progress against the catalog and award
    /// every newly satisfied achievement exactly once. Safe to call
    /// repeatedly: earned entries are skipped and the award insert is
    /// conflict-free, so a second pass with no new activity returns an
    /// empty list. A learner that does not exist yields no awards.
    pub async fn evaluate(&self, user_id: Uuid) -> Result<Vec<Achievement>> {
        let user_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        if user_exists.is_none() {
            return Ok(Vec::new());
        }

        let snapshot = self.progress_snapshot(user_id).await?;

        // Insertion order keeps the returned list stable; it does not
        // influence which entries qualify.
        let catalog = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT id, name, description, icon, rule, points, created_at
            FROM achievements
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let earned: Vec<Uuid> =
            sqlx::query_scalar("SELECT achievement_id FROM user_achievements WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        let mut newly_awarded = Vec::new();

        for achievement in catalog {
            if earned.contains(&achievement.id) {
                continue;
            }
            if !achievement.rule.is_satisfied(&snapshot) {
                continue;
            }

            // The unique constraint makes a concurrent duplicate award a
            // no-op rather than an error.
            let inserted = sqlx::query(
                r#"
                INSERT INTO user_achievements (user_id, achievement_id, progress)
                VALUES ($1, $2, 100)
                ON CONFLICT (user_id, achievement_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(achievement.id)
            .execute(&self.pool)
            .await?;

            if inserted.rows_affected() > 0 {
                tracing::info!(
                    user_id = %user_id,
                    achievement = %achievement.name,
                    "achievement awarded"
                );
                newly_awarded.push(achievement);
            }
        }

        Ok(newly_awarded)
    }

    async fn progress_snapshot(&self, user_id: Uuid) -> Result<ProgressSnapshot> {
        let (completed_lessons, completed_courses, perfect_quizzes) = futures::try_join!(
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND is_completed"
            )
            .bind(user_id)
            .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM user_progress WHERE user_id = $1 AND progress >= 100.0"
            )
            .bind(user_id)
            .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND quiz_score = 100"
            )
            .bind(user_id)
            .fetch_one(&self.pool),
        )?;

        Ok(ProgressSnapshot {
            completed_lessons,
            completed_courses,
            perfect_quizzes,
        })
    }

    pub async fn get_user_achievements(&self, user_id: Uuid) -> Result<Vec<EarnedAchievement>> {
        let rows = sqlx::query_as::<_, EarnedRow>(
            r#"
            SELECT a.id, a.name, a.description, a.icon, a.rule, a.points, a.created_at,
                   ua.earned_at, ua.progress AS earned_progress
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE ua.user_id = $1
            ORDER BY ua.earned_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EarnedAchievement {
                achievement: Achievement {
                    id: row.id,
                    name: row.name,
                    description: row.description,
                    icon: row.icon,
                    rule: row.rule,
                    points: row.points,
                    created_at: row.created_at,
                },
                earned_at: row.earned_at,
                progress: row.earned_progress,
            })
            .collect())
    }

    pub async fn get_all_achievements(&self) -> Result<Vec<Achievement>> {
        let catalog = sqlx::query_as::<_, Achievement>(
            r#"
            SELECT id, name, description, icon, rule, points, created_at
            FROM achievements
            ORDER BY points DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(catalog)
    }

    pub async fn get_user_points(&self, user_id: Uuid) -> Result<UserPoints> {
        let (total_points, achievements_count): (Option<i64>, i64) = sqlx::query_as(
            r#"
            SELECT SUM(a.points)::BIGINT, COUNT(*)
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE ua.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserPoints {
            total_points: total_points.unwrap_or(0),
            achievements_count,
        })
    }
}
