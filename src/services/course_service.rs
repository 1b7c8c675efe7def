use crate::dto::course_dto::{
    AuthorProfile, CourseDetail, CourseListQuery, CourseSummary, CreateCoursePayload,
    LessonDetail, LessonTree, ModuleTree, PaginatedCourses, UpdateCoursePayload,
};
use crate::error::{Error, Result};
use crate::models::course::{
    Course, CourseModule, Lesson, LessonContent, CONTENT_TYPES, COURSE_CATEGORIES, COURSE_LEVELS,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the whole curriculum tree in one transaction. Course duration
    /// is the sum of its lesson durations.
    pub async fn create(&self, payload: CreateCoursePayload, author_id: Uuid) -> Result<CourseDetail> {
        if !COURSE_CATEGORIES.contains(&payload.category.as_str()) {
            return Err(Error::BadRequest(format!(
                "Unknown category: {}",
                payload.category
            )));
        }
        if !COURSE_LEVELS.contains(&payload.level.as_str()) {
            return Err(Error::BadRequest(format!("Unknown level: {}", payload.level)));
        }
        for content in payload.modules.iter().flat_map(|m| &m.lessons).flat_map(|l| &l.content) {
            if !CONTENT_TYPES.contains(&content.content_type.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Unknown content type: {}",
                    content.content_type
                )));
            }
        }

        let price = Decimal::from_f64(payload.price)
            .ok_or_else(|| Error::BadRequest("Invalid price".to_string()))?;
        let duration: i32 = payload
            .modules
            .iter()
            .flat_map(|m| &m.lessons)
            .map(|l| l.duration)
            .sum();

        let mut tx = self.pool.begin().await?;

        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (title, description, thumbnail, category, level, price, duration, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, thumbnail, category, level, price, duration,
                      author_id, is_published, created_at, updated_at
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.thumbnail)
        .bind(&payload.category)
        .bind(&payload.level)
        .bind(price)
        .bind(duration)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        for module in &payload.modules {
            let module_id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO course_modules (course_id, title, position)
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(course.id)
            .bind(&module.title)
            .bind(module.position)
            .fetch_one(&mut *tx)
            .await?;

            for lesson in &module.lessons {
                let lesson_id: Uuid = sqlx::query_scalar(
                    r#"
                    INSERT INTO lessons (module_id, title, position, duration, is_free)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(module_id)
                .bind(&lesson.title)
                .bind(lesson.position)
                .bind(lesson.duration)
                .bind(lesson.is_free.unwrap_or(false))
                .fetch_one(&mut *tx)
                .await?;

                for content in &lesson.content {
                    sqlx::query(
                        r#"
                        INSERT INTO lesson_contents (lesson_id, position, content_type, body, url, duration, quiz)
                        VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(lesson_id)
                    .bind(content.position)
                    .bind(&content.content_type)
                    .bind(&content.content)
                    .bind(&content.url)
                    .bind(content.duration)
                    .bind(content.quiz.clone().map(Json))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;

        self.get_by_id(course.id).await
    }

    /// Published courses with search/category/level/price filters and
    /// page/limit pagination, each enriched with its average rating and
    /// enrolled-student count.
    pub async fn list(&self, query: CourseListQuery) -> Result<PaginatedCourses> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let items = sqlx::query_as::<_, CourseSummary>(
            r#"
            SELECT c.id, c.title, c.description, c.thumbnail, c.category, c.level,
                   c.price, c.duration, c.is_published, c.author_id,
                   u.first_name AS author_first_name,
                   u.last_name AS author_last_name,
                   u.avatar AS author_avatar,
                   COALESCE((SELECT AVG(r.rating)::DOUBLE PRECISION
                             FROM course_ratings r WHERE r.course_id = c.id), 0) AS average_rating,
                   (SELECT COUNT(*) FROM user_progress up WHERE up.course_id = c.id) AS total_students,
                   c.created_at, c.updated_at
            FROM courses c
            JOIN users u ON u.id = c.author_id
            WHERE c.is_published = TRUE
              AND ($1::TEXT IS NULL OR c.title ILIKE '%' || $1 || '%' OR c.description ILIKE '%' || $1 || '%')
              AND ($2::TEXT IS NULL OR c.category = $2)
              AND ($3::TEXT IS NULL OR c.level = $3)
              AND ($4::NUMERIC IS NULL OR c.price >= $4)
              AND ($5::NUMERIC IS NULL OR c.price <= $5)
            ORDER BY c.created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(&query.search)
        .bind(&query.category)
        .bind(&query.level)
        .bind(query.min_price)
        .bind(query.max_price)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM courses c
            WHERE c.is_published = TRUE
              AND ($1::TEXT IS NULL OR c.title ILIKE '%' || $1 || '%' OR c.description ILIKE '%' || $1 || '%')
              AND ($2::TEXT IS NULL OR c.category = $2)
              AND ($3::TEXT IS NULL OR c.level = $3)
              AND ($4::NUMERIC IS NULL OR c.price >= $4)
              AND ($5::NUMERIC IS NULL OR c.price <= $5)
            "#,
        )
        .bind(&query.search)
        .bind(&query.category)
        .bind(&query.level)
        .bind(query.min_price)
        .bind(query.max_price)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(PaginatedCourses {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get_by_id(&self, course_id: Uuid) -> Result<CourseDetail> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, description, thumbnail, category, level, price, duration,
                   author_id, is_published, created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Course not found".to_string()))?;

        let author = sqlx::query_as::<_, AuthorProfile>(
            "SELECT id, first_name, last_name, avatar, bio FROM users WHERE id = $1",
        )
        .bind(course.author_id)
        .fetch_one(&self.pool)
        .await?;

        let modules = self.load_module_trees(course_id).await?;

        let (average_rating, total_ratings): (Option<f64>, i64) = sqlx::query_as(
            r#"
            SELECT AVG(rating)::DOUBLE PRECISION, COUNT(*)
            FROM course_ratings
            WHERE course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CourseDetail {
            course,
            author,
            modules,
            average_rating: average_rating.unwrap_or(0.0),
            total_ratings,
        })
    }

    async fn load_module_trees(&self, course_id: Uuid) -> Result<Vec<ModuleTree>> {
        let modules = sqlx::query_as::<_, CourseModule>(
            r#"
            SELECT id, course_id, title, position
            FROM course_modules
            WHERE course_id = $1
            ORDER BY position
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let module_ids: Vec<Uuid> = modules.iter().map(|m| m.id).collect();
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT id, module_id, title, position, duration, is_free
            FROM lessons
            WHERE module_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&module_ids)
        .fetch_all(&self.pool)
        .await?;

        let lesson_ids: Vec<Uuid> = lessons.iter().map(|l| l.id).collect();
        let mut contents = self.load_contents(&lesson_ids).await?;

        let mut trees = Vec::with_capacity(modules.len());
        for module in modules {
            let module_lessons = lessons
                .iter()
                .filter(|l| l.module_id == module.id)
                .map(|lesson| LessonTree {
                    lesson: lesson.clone(),
                    content: contents.remove(&lesson.id).unwrap_or_default(),
                })
                .collect();
            trees.push(ModuleTree {
                module,
                lessons: module_lessons,
            });
        }
        Ok(trees)
    }

    async fn load_contents(
        &self,
        lesson_ids: &[Uuid],
    ) -> Result<std::collections::HashMap<Uuid, Vec<LessonContent>>> {
        let rows = sqlx::query_as::<_, LessonContent>(
            r#"
            SELECT id, lesson_id, position, content_type, body, url, duration, quiz
            FROM lesson_contents
            WHERE lesson_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(lesson_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_lesson: std::collections::HashMap<Uuid, Vec<LessonContent>> =
            std::collections::HashMap::new();
        for row in rows {
            by_lesson.entry(row.lesson_id).or_default().push(row);
        }
        Ok(by_lesson)
    }

    pub async fn update(
        &self,
        course_id: Uuid,
        payload: UpdateCoursePayload,
        user_id: Uuid,
    ) -> Result<CourseDetail> {
        self.require_author(course_id, user_id, "update").await?;

        let price = match payload.price {
            Some(value) => Some(
                Decimal::from_f64(value)
                    .ok_or_else(|| Error::BadRequest("Invalid price".to_string()))?,
            ),
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE courses
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                thumbnail = COALESCE($4, thumbnail),
                category = COALESCE($5, category),
                level = COALESCE($6, level),
                price = COALESCE($7, price),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.thumbnail)
        .bind(&payload.category)
        .bind(&payload.level)
        .bind(price)
        .execute(&self.pool)
        .await?;

        self.get_by_id(course_id).await
    }

    pub async fn delete(&self, course_id: Uuid, user_id: Uuid) -> Result<()> {
        self.require_author(course_id, user_id, "delete").await?;

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn publish(&self, course_id: Uuid, user_id: Uuid) -> Result<Course> {
        self.require_author(course_id, user_id, "publish").await?;

        let module_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM course_modules WHERE course_id = $1")
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        if module_count == 0 {
            return Err(Error::BadRequest(
                "Course must have at least one module".to_string(),
            ));
        }

        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET is_published = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, thumbnail, category, level, price, duration,
                      author_id, is_published, created_at, updated_at
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    pub async fn rate(&self, course_id: Uuid, user_id: Uuid, rating: i32) -> Result<()> {
        let course_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        if course_exists.is_none() {
            return Err(Error::NotFound("Course not found".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO course_ratings (user_id, course_id, rating)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO UPDATE SET rating = $3
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lessons of every module in course order.
    pub async fn list_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let course_exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        if course_exists.is_none() {
            return Err(Error::NotFound("Course not found".to_string()));
        }

        self.flattened_lessons(course_id).await
    }

    /// Lesson with its contents plus previous/next pointers over the
    /// course's flattened lesson order.
    pub async fn get_lesson(&self, lesson_id: Uuid) -> Result<LessonDetail> {
        let found: Option<(Uuid,)> = sqlx::query_as(
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

        let Some((course_id,)) = found else {
            return Err(Error::NotFound("Lesson not found".to_string()));
        };

        let ordered = self.flattened_lessons(course_id).await?;
        let index = ordered
            .iter()
            .position(|l| l.id == lesson_id)
            .ok_or_else(|| Error::NotFound("Lesson not found".to_string()))?;

        let previous = (index > 0).then(|| ordered[index - 1].clone());
        let next = ordered.get(index + 1).cloned();
        let lesson = ordered[index].clone();

        let content = sqlx::query_as::<_, LessonContent>(
            r#"
            SELECT id, lesson_id, position, content_type, body, url, duration, quiz
            FROM lesson_contents
            WHERE lesson_id = $1
            ORDER BY position
            "#,
        )
        .bind(lesson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(LessonDetail {
            lesson,
            content,
            course_id,
            previous,
            next,
        })
    }

    async fn flattened_lessons(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.module_id, l.title, l.position, l.duration, l.is_free
            FROM lessons l
            JOIN course_modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            ORDER BY m.position, l.position
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lessons)
    }

    async fn require_author(&self, course_id: Uuid, user_id: Uuid, action: &str) -> Result<()> {
        let author_id: Option<Uuid> =
            sqlx::query_scalar("SELECT author_id FROM courses WHERE id = $1")
                .bind(course_id)
                .fetch_optional(&self.pool)
                .await?;

        match author_id {
            None => Err(Error::NotFound("Course not found".to_string())),
            Some(author) if author != user_id => Err(Error::Forbidden(format!(
                "You can only {} your own courses",
                action
            ))),
            Some(_) => Ok(()),
        }
    }
}
