use maud::{html, Markup, DOCTYPE};

use crate::models::Paste;
use crate::types::api::iso8601;

const PAGE_CSS: &str = "body{font-family:system-ui,-apple-system,Roboto,Arial;padding:20px}\
pre{white-space:pre-wrap;background:#f7f7f7;padding:16px;border-radius:6px}";

fn page_shell(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width,initial-scale=1";
                title { (title) }
                style { (PAGE_CSS) }
            }
            body { (body) }
        }
    }
}

/// The standalone viewer page for a paste. Content is escaped by `maud`.
pub fn render_paste(paste: &Paste) -> Markup {
    let expires_at = paste
        .expires_at
        .map_or_else(|| "Never".to_owned(), iso8601);
    let remaining_views = paste
        .remaining_views
        .map_or_else(|| "Unlimited".to_owned(), |n| n.to_string());

    page_shell(
        &format!("Paste {}", paste.id),
        html! {
            h1 { "Paste" }
            div style="color:#666" {
                "Expires: " (expires_at) " \u{2022} Remaining views: " (remaining_views)
            }
            pre { (paste.content) }
        },
    )
}

pub fn not_found_page() -> Markup {
    page_shell(
        "Not Found",
        html! {
            h1 { "404 Not Found" }
            p { "Paste not found or unavailable." }
        },
    )
}

pub fn internal_error_page() -> Markup {
    page_shell(
        "Internal Server Error",
        html! {
            h1 { "500 Internal Server Error" }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paste(id: &str, content: &str) -> Paste {
        Paste {
            id: id.to_owned(),
            content: content.to_owned(),
            created_at: 0,
            expires_at: None,
            remaining_views: Some(3),
        }
    }

    #[test]
    fn content_and_id_are_escaped() {
        let page = render_paste(&paste(
            "<id>",
            r#"<script>alert("x" & 'y')</script>"#,
        ))
        .into_string();

        assert!(page.contains("<title>Paste &lt;id&gt;</title>"));
        assert!(page.contains("&lt;script&gt;alert(&quot;x&quot; &amp; 'y')&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn page_shows_limits() {
        let page = render_paste(&paste("abc", "<b>bold</b>")).into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("Expires: Never"));
        assert!(page.contains("Remaining views: 3"));
        assert!(page.contains("<pre>&lt;b&gt;bold&lt;/b&gt;</pre>"));
    }

    #[test]
    fn page_shows_unlimited_and_expiry() {
        let page = render_paste(&Paste {
            expires_at: Some(0),
            remaining_views: None,
            ..paste("abc", "x")
        })
        .into_string();
        assert!(page.contains("Expires: 1970-01-01T00:00:00.000Z"));
        assert!(page.contains("Remaining views: Unlimited"));
    }

    #[test]
    fn error_pages_say_what_happened() {
        assert!(not_found_page().into_string().contains("<h1>404 Not Found</h1>"));
        assert!(internal_error_page()
            .into_string()
            .contains("<h1>500 Internal Server Error</h1>"));
    }
}
