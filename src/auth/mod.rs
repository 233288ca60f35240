pub mod firebase;
pub mod session_gate;

use poem::{
    http::{header, StatusCode},
    Endpoint, Middleware, Response,
};

pub use firebase::{FirebaseVerifier, IdentityVerifier, VerifyError};

/// Session key holding the verified user id.
pub const USER_KEY: &str = "user";

pub const LOGIN_PAGE: &str = "/auth";

/// Requires an established session, otherwise redirects to the login page.
pub struct SessionGate;

impl<E: Endpoint> Middleware<E> for SessionGate {
    type Output = session_gate::SessionGateEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        session_gate::SessionGateEndpoint(ep)
    }
}

pub fn redirect_to_login() -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, LOGIN_PAGE)
        .finish()
}
