//! Inline player page.
//!
//! Pure templating: the page only points a `<video>` element at the stream
//! route, so nothing is resolved here and a bad link surfaces when the
//! player requests the stream.

use axum::extract::Path;
use axum::response::Html;

/// GET /watch/{link}
pub async fn watch_page(Path(link): Path<String>) -> Html<String> {
    Html(render_player(&link))
}

/// Render the player page for `link` (the decoded deep-link text).
pub fn render_player(link: &str) -> String {
    // Percent-encoding leaves only [A-Za-z0-9-_.~%], all safe inside an
    // HTML attribute.
    let stream_url = format!("/stream/{}", urlencoding::encode(link));

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Stream</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body {{ margin: 0; background: #000; display: flex; justify-content: center; align-items: center; height: 100vh; }}
        video {{ width: 100%; max-width: 1000px; height: auto; outline: none; }}
    </style>
</head>
<body>
    <video controls autoplay>
        <source src="{stream_url}">
        Your browser does not support video playback.
    </video>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_points_at_stream_route() {
        let html = render_player("https://t.me/b/1/2");
        assert!(html.contains(r#"<source src="/stream/https%3A%2F%2Ft.me%2Fb%2F1%2F2">"#));
        assert!(html.contains("<video controls autoplay>"));
    }

    #[test]
    fn markup_in_link_is_neutralized() {
        let html = render_player(r#""><script>alert(1)</script>"#);
        assert!(!html.contains("<script>"));
    }
}
