use poem::{http::StatusCode, Error, FromRequest, Request, RequestBody, Result};

use crate::auth::session_gate::get_session_user;

/// The user id stored in the current session.
pub struct SessionUser {
    pub uid: String,
}

impl<'a> FromRequest<'a> for SessionUser {
    async fn from_request(req: &'a Request, _body: &mut RequestBody) -> Result<Self> {
        match get_session_user(req) {
            Some(uid) => Ok(SessionUser { uid }),
            None => Err(Error::from_string(
                "no active session".to_string(),
                StatusCode::UNAUTHORIZED,
            )),
        }
    }
}
