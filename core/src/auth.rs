//! Inbound bearer-token checks. The expected token is loaded once at startup;
//! comparison is exact, with no hashing and no expiry.

/// Exact string comparison of a supplied token against the expected one.
pub fn validate(supplied: &str, expected: &str) -> bool {
    supplied == expected
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Process-wide auth settings.
#[derive(Clone, Default)]
pub struct AuthContext {
    expected_token: Option<String>,
}

impl AuthContext {
    pub fn new(expected_token: Option<String>) -> Self {
        Self { expected_token }
    }

    /// Auth is off when no token is configured.
    pub fn is_enabled(&self) -> bool {
        self.expected_token.is_some()
    }

    /// Checks a raw `Authorization` header value. Always true when auth is off.
    pub fn authorize(&self, header: Option<&str>) -> bool {
        match &self.expected_token {
            None => true,
            Some(expected) => header
                .and_then(bearer_token)
                .is_some_and(|supplied| validate(supplied, expected)),
        }
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
