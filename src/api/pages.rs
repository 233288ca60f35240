use poem::{handler, web::Html};
use tracing::debug;

use crate::extractor::session_user::SessionUser;

const AUTH_PAGE: &str = include_str!("../../templates/auth.html");
const INDEX_PAGE: &str = include_str!("../../templates/index.html");

#[handler]
pub fn auth_page() -> Html<&'static str> {
    Html(AUTH_PAGE)
}

#[handler]
pub fn index(user: SessionUser) -> Html<&'static str> {
    debug!("serving index for {}", user.uid);
    Html(INDEX_PAGE)
}
