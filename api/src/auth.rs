use crate::config::AuthConfig;
use crate::requests::MethodRequest;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha512};

const ADMIN_HOUR_FORMAT: &str = "%Y%m%d%H";

/// Lowercase hex SHA-512 of the UTF-8 input.
pub fn digest(input: &str) -> String {
    hex::encode(Sha512::digest(input.as_bytes()))
}

/// The token the caller must present at `now`.
///
/// The administrator's token rotates hourly; everybody else's is bound to
/// their account and login.
pub fn expected_token(request: &MethodRequest, auth: &AuthConfig, now: DateTime<Local>) -> String {
    if request.is_admin(&auth.admin_login) {
        digest(&format!("{}{}", now.format(ADMIN_HOUR_FORMAT), auth.admin_salt))
    } else {
        digest(&format!(
            "{}{}{}",
            request.account.as_deref().unwrap_or_default(),
            request.login.as_deref().unwrap_or_default(),
            auth.salt
        ))
    }
}

pub fn check_auth(request: &MethodRequest, auth: &AuthConfig) -> bool {
    check_auth_at(request, auth, Local::now())
}

pub fn check_auth_at(request: &MethodRequest, auth: &AuthConfig, now: DateTime<Local>) -> bool {
    request
        .token
        .as_deref()
        .is_some_and(|token| token == expected_token(request, auth, now))
}
