//! Server-rendered page shells. Styling lives in the frontend bundle; these
//! only carry the forms and the post-sign-in return path.

use axum::extract::Query;
use axum::response::Html;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::guard::sanitize_next;

pub const SIGNUP_PATH: &str = "/signup";

#[derive(Deserialize)]
pub struct PageQuery {
    pub next: Option<String>,
    /// Message from a failed form post.
    pub error: Option<String>,
}

/// `GET /`
pub async fn landing() -> Html<String> {
    Html(shell(
        "Clubhouse",
        r#"<h1>Clubhouse</h1>
<p>The community space for club members.</p>
<p><a href="/signin">Sign in</a> or <a href="/signup">join the club</a>.</p>"#,
    ))
}

/// `GET /signin?next=...&error=...`
pub async fn signin(Query(query): Query<PageQuery>) -> Html<String> {
    let next = encode_double_quoted_attribute(sanitize_next(query.next.as_deref()));
    let error = error_banner(query.error.as_deref());
    Html(shell(
        "Sign in",
        &format!(
            r#"<h1>Sign in</h1>
{error}<form method="post" action="/api/auth/signin">
<input type="hidden" name="next" value="{next}">
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Sign in</button>
</form>
<p>New here? <a href="/signup">Create an account</a>.</p>"#
        ),
    ))
}

/// `GET /signup?error=...`
pub async fn signup(Query(query): Query<PageQuery>) -> Html<String> {
    let error = error_banner(query.error.as_deref());
    Html(shell(
        "Join",
        &format!(
            r#"<h1>Join the club</h1>
{error}<form method="post" action="/api/auth/signup">
<label>Name <input type="text" name="display_name"></label>
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" minlength="6" required></label>
<button type="submit">Create account</button>
</form>
<p>Already a member? <a href="/signin">Sign in</a>.</p>"#
        ),
    ))
}

fn error_banner(error: Option<&str>) -> String {
    match error.filter(|e| !e.is_empty()) {
        Some(e) => format!("<p class=\"error\" role=\"alert\">{}</p>\n", encode_text(e)),
        None => String::new(),
    }
}

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{body}\n</body>\n</html>\n",
        encode_text(title)
    )
}
