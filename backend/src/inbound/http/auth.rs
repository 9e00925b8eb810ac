//! Session-principal extraction.
//!
//! The cookie session carries the authenticated `{id, role}` pair; the
//! domain trusts this principal without re-verification. Token issuance
//! mechanics beyond the cookie session are out of scope.

use actix_session::{Session, SessionExt};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{Ready, ready};

use crate::domain::user::{Actor, Role, User};
use crate::domain::{Error, UserId};

use super::error::ApiError;

const SESSION_USER_ID: &str = "user_id";
const SESSION_ROLE: &str = "role";

/// The authenticated principal extracted from the session cookie.
///
/// Handlers that require authentication take this as an extractor; use
/// `Option<Principal>` where anonymous access is allowed.
#[derive(Debug, Clone, Copy)]
pub struct Principal(pub Actor);

impl Principal {
    /// The underlying domain actor.
    pub const fn actor(&self) -> Actor {
        self.0
    }

    fn from_session(session: &Session) -> Result<Self, ApiError> {
        let user_id = session
            .get::<UserId>(SESSION_USER_ID)
            .map_err(|_| ApiError::from_domain(Error::unauthorized("session unreadable")))?;
        let role = session
            .get::<String>(SESSION_ROLE)
            .map_err(|_| ApiError::from_domain(Error::unauthorized("session unreadable")))?;

        match (user_id, role.as_deref().and_then(Role::parse)) {
            (Some(id), Some(role)) => Ok(Self(Actor { id, role })),
            _ => Err(ApiError::from_domain(Error::unauthorized(
                "authentication required",
            ))),
        }
    }

    /// Store the principal for a freshly authenticated user.
    pub fn persist(session: &Session, user: &User) -> Result<(), ApiError> {
        session
            .insert(SESSION_USER_ID, user.id)
            .and_then(|()| session.insert(SESSION_ROLE, user.role.as_str()))
            .map_err(|e| {
                ApiError::from_domain(Error::internal(format!("session write failed: {e}")))
            })
    }

    /// Drop the session, logging the user out.
    pub fn clear(session: &Session) {
        session.purge();
    }
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = req.get_session();
        ready(Self::from_session(&session))
    }
}
