use rand::{distributions::Alphanumeric, Rng};

/// 48 alphanumeric characters ≈ 285 bits of entropy, comfortably above the
/// 128-bit floor required for possession-as-credential tokens.
pub const SECURE_TOKEN_LEN: usize = 48;

/// Generate an opaque, unguessable token string.
pub fn generate_secure_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECURE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Generate the (confirmation, cancellation) pair minted once per
/// appointment. The two secrets must never collide.
pub fn generate_token_pair() -> (String, String) {
    let confirmation = generate_secure_token();
    let mut cancellation = generate_secure_token();
    while cancellation == confirmation {
        cancellation = generate_secure_token();
    }
    (confirmation, cancellation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_expected_length_and_charset() {
        let token = generate_secure_token();
        assert_eq!(token.len(), SECURE_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate_secure_token();
        let b = generate_secure_token();
        assert_ne!(a, b);
    }

    #[test]
    fn pair_is_always_distinct() {
        for _ in 0..100 {
            let (confirmation, cancellation) = generate_token_pair();
            assert_ne!(confirmation, cancellation);
        }
    }
}
