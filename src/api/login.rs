use poem::{
    handler,
    http::StatusCode,
    session::Session,
    web::{Data, Json},
    Body, IntoResponse, Response,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{redirect_to_login, USER_KEY};

use super::AppState;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LoginReq {
    id_token: Option<String>,
}

#[derive(Serialize)]
struct LoginResp {
    status: &'static str,
}

fn login_error() -> Response {
    Json(LoginResp { status: "error" })
        .with_status(StatusCode::UNAUTHORIZED)
        .into_response()
}

#[handler]
pub async fn login(body: Body, session: &Session, state: Data<&AppState>) -> Response {
    let req = match body.into_json::<LoginReq>().await {
        Ok(req) => req,
        Err(e) => {
            warn!("login body is not valid json: {}", e);
            return login_error();
        }
    };

    let Some(token) = req.id_token else {
        warn!("login without idToken");
        return login_error();
    };

    match state.verifier.verify(&token).await {
        Ok(uid) => {
            session.set(USER_KEY, &uid);
            // fresh session id for the authenticated user
            session.renew();
            info!("user {} logged in", uid);
            Json(LoginResp { status: "success" }).into_response()
        }
        Err(e) => {
            warn!("verify id token error: {}", e);
            login_error()
        }
    }
}

#[handler]
pub fn logout(session: &Session) -> Response {
    if let Some(uid) = session.get::<String>(USER_KEY) {
        info!("user {} logged out", uid);
    }

    session.purge();
    redirect_to_login()
}
