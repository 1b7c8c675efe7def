use rand::{thread_rng, Rng};

/// Six-digit numeric code for email verification.
pub fn generate_verification_code() -> String {
    thread_rng().gen_range(100_000..1_000_000).to_string()
}
