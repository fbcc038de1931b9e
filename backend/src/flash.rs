use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionMiddleware};
use actix_web::cookie::Key;
use log::{error, warn};
use sha2::{Digest, Sha512};
use shared::Notice;

pub const SESSION_COOKIE: &str = "galaxy_session";
const FLASH_KEY: &str = "_flashes";

/// Stretches the configured secret into a 64-byte cookie key, or generates a
/// throwaway one so flash notices still work on a dev box.
pub fn signing_key(secret: Option<&str>) -> Key {
    match secret {
        Some(secret) => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        None => {
            warn!("SECRET_KEY not set; using a random key, flash notices will not survive restarts");
            Key::generate()
        }
    }
}

pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_secure(secure)
        .build()
}

pub fn push(session: &Session, notice: Notice) {
    let mut pending: Vec<Notice> = match session.get(FLASH_KEY) {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            warn!("Discarding unreadable flash payload: {}", e);
            Vec::new()
        }
    };
    pending.push(notice);
    if let Err(e) = session.insert(FLASH_KEY, pending) {
        error!("Failed to store flash notice: {}", e);
    }
}

/// Returns pending notices and clears them.
pub fn take(session: &Session) -> Vec<Notice> {
    match session.remove_as::<Vec<Notice>>(FLASH_KEY) {
        Some(Ok(notices)) => notices,
        Some(Err(raw)) => {
            warn!("Discarding unreadable flash payload: {}", raw);
            Vec::new()
        }
        None => Vec::new(),
    }
}
