pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    achievement_service::AchievementService, auth_service::AuthService,
    course_service::CourseService, payment_service::PaymentService,
    progress_service::ProgressService, user_service::UserService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub course_service: CourseService,
    pub progress_service: ProgressService,
    pub achievement_service: AchievementService,
    pub payment_service: PaymentService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let auth_service = AuthService::new(pool.clone());
        let user_service = UserService::new(pool.clone());
        let course_service = CourseService::new(pool.clone());
        let progress_service = ProgressService::new(pool.clone());
        let achievement_service = AchievementService::new(pool.clone());
        let payment_service = PaymentService::new(pool.clone());

        Self {
            pool,
            auth_service,
            user_service,
            course_service,
            progress_service,
            achievement_service,
            payment_service,
        }
    }
}
