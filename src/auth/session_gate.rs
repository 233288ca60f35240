use poem::{session::Session, Endpoint, IntoResponse, Request, Response, Result};
use tracing::{debug, error};

use super::{redirect_to_login, USER_KEY};

pub struct SessionGateEndpoint<E>(pub E);

impl<E: Endpoint> Endpoint for SessionGateEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> Result<Self::Output> {
        let Some(user) = get_session_user(&req) else {
            debug!("no session for {}, redirecting to login", req.uri());
            return Ok(redirect_to_login());
        };

        debug!("session user: {}", user);

        let res = self.0.call(req).await;
        match res {
            Ok(resp) => {
                let resp = resp.into_response();
                debug!("response: {}", resp.status());
                Ok(resp)
            }
            Err(err) => {
                error!("error: {err}");
                Err(err)
            }
        }
    }
}

// reads the session installed by the outer session middleware
pub fn get_session_user(req: &Request) -> Option<String> {
    let session: &Session = req.extensions().get()?;

    session.get::<String>(USER_KEY)
}
