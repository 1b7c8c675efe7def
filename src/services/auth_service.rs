use crate::config::get_config;
use crate::dto::auth_dto::{
    AuthResponse, LoginRequest, RegisterRequest, TokenPair, VerifyEmailRequest,
};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::{User, UserProfile};
use crate::utils::token::generate_verification_code;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_USER: &str = r#"
    SELECT id, email, password_hash, first_name, last_name, role, avatar, bio,
           is_verified, verification_code, verification_code_expires,
           created_at, updated_at
    FROM users
"#;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterRequest) -> Result<UserProfile> {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&payload.email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "User with this email already exists".to_string(),
            ));
        }

        let role = payload.role.unwrap_or_else(|| "student".to_string());
        if role != "student" && role != "teacher" {
            return Err(Error::BadRequest(format!("Unknown role: {}", role)));
        }

        let password_hash = hash_password(&payload.password)?;
        let verification_code = generate_verification_code();
        let expires_at = Utc::now() + Duration::hours(24);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role,
                               verification_code, verification_code_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, password_hash, first_name, last_name, role, avatar, bio,
                      is_verified, verification_code, verification_code_expires,
                      created_at, updated_at
            "#,
        )
        .bind(&payload.email)
        .bind(&password_hash)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(&role)
        .bind(&verification_code)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        // Email delivery is handled outside this service; the code goes to
        // the log so operators can relay it in development.
        tracing::info!(email = %user.email, code = %verification_code, "verification code issued");

        Ok(user.into())
    }

    pub async fn verify_email(&self, payload: VerifyEmailRequest) -> Result<()> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(&payload.email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::BadRequest("User not found".to_string()))?;

        if user.is_verified {
            return Err(Error::BadRequest("Email already verified".to_string()));
        }
        match &user.verification_code {
            Some(code) if *code == payload.code => {}
            _ => return Err(Error::BadRequest("Invalid verification code".to_string())),
        }
        if let Some(expires) = user.verification_code_expires {
            if expires < Utc::now() {
                return Err(Error::BadRequest("Verification code expired".to_string()));
            }
        }

        sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_code = NULL,
                verification_code_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn login(&self, payload: LoginRequest) -> Result<AuthResponse> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(&payload.email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid credentials".to_string()))?;

        if !verify_password(&payload.password, &user.password_hash)? {
            return Err(Error::Unauthorized("Invalid credentials".to_string()));
        }
        if !user.is_verified {
            return Err(Error::Unauthorized(
                "Please verify your email first".to_string(),
            ));
        }

        let tokens = issue_tokens(&user)?;
        Ok(AuthResponse {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let config = get_config();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<Claims>(
            refresh_token,
            &DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| Error::Unauthorized("Invalid refresh token".to_string()))?
        .claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("Invalid refresh token".to_string()))?;

        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = $1", SELECT_USER))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid refresh token".to_string()))?;

        issue_tokens(&user)
    }
}

fn issue_tokens(user: &User) -> Result<TokenPair> {
    let config = get_config();
    let now = Utc::now().timestamp();

    let access_claims = Claims {
        sub: user.id.to_string(),
        exp: (now + config.jwt_expires_in_secs) as usize,
        role: Some(user.role.clone()),
    };
    let refresh_claims = Claims {
        sub: user.id.to_string(),
        exp: (now + config.jwt_refresh_expires_in_secs) as usize,
        role: Some(user.role.clone()),
    };

    let access_token = encode(
        &Header::default(),
        &access_claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))?;
    let refresh_token = encode(
        &Header::default(),
        &refresh_claims,
        &EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(plain: &str, hashed: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }
}
