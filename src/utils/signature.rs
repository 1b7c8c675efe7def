use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify a Stripe webhook signature header of the form
/// `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. The signed payload is
/// `"{timestamp}.{body}"` keyed with the endpoint secret.
pub fn verify_stripe_signature(body: &str, header: &str, secret: &str) -> bool {
    let mut timestamp = None;
    let mut candidates = Vec::new();

    for part in header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(value)) => timestamp = Some(value),
            (Some("v1"), Some(value)) => candidates.push(value),
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        return false;
    };
    if candidates.is_empty() {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    candidates
        .iter()
        .any(|candidate| expected.as_bytes().ct_eq(candidate.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn sign(body: &str, timestamp: &str, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_valid_signature() {
        let body = r#"{"type":"payment_intent.succeeded"}"#;
        let sig = sign(body, "1700000000", "whsec_test");
        let header = format!("t=1700000000,v1={}", sig);
        assert!(verify_stripe_signature(body, &header, "whsec_test"));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let sig = sign("original", "1700000000", "whsec_test");
        let header = format!("t=1700000000,v1={}", sig);
        assert!(!verify_stripe_signature("tampered", &header, "whsec_test"));
    }

    #[test]
    fn rejects_wrong_secret_and_garbage_headers() {
        let body = "payload";
        let sig = sign(body, "1700000000", "whsec_test");
        let header = format!("t=1700000000,v1={}", sig);
        assert!(!verify_stripe_signature(body, &header, "whsec_other"));
        assert!(!verify_stripe_signature(body, "v1=deadbeef", "whsec_test"));
        assert!(!verify_stripe_signature(body, "t=1700000000", "whsec_test"));
        assert!(!verify_stripe_signature(body, "", "whsec_test"));
    }

    #[test]
    fn accepts_any_matching_candidate_among_several() {
        let body = "payload";
        let sig = sign(body, "1700000000", "whsec_test");
        let header = format!("t=1700000000,v1=deadbeef,v1={}", sig);
        assert!(verify_stripe_signature(body, &header, "whsec_test"));
    }
}
