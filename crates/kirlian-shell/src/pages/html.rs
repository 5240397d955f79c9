use std::fmt::Write as _;

use kirlian_core::ErrorPage;

use super::RETRY_INSTRUCTIONS;

const STYLE: &str = "body{margin:0;font-family:system-ui,-apple-system,'Segoe UI',sans-serif;\
background:#0e1117;color:#fafafa;display:flex;align-items:center;justify-content:center;\
min-height:100vh}main{max-width:760px;padding:32px}h1{font-size:1.5rem;margin:0 0 12px}\
.cause{color:#ff8c8c;margin:0 0 20px}ol{line-height:1.6}pre{background:#1b1f2a;padding:12px;\
border-radius:6px;overflow-x:auto;font-size:.85rem;white-space:pre-wrap}\
.retry{margin-top:24px;padding:12px;border:1px solid #3d4455;border-radius:6px}\
.spinner{width:40px;height:40px;border:4px solid #3d4455;border-top-color:#ff4b4b;\
border-radius:50%;animation:spin 1s linear infinite;margin:0 auto 16px}\
@keyframes spin{to{transform:rotate(360deg)}}";

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn document(title: &str, head_extra: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<title>{}</title>{head_extra}<style>{STYLE}</style></head>\n<body><main>{body}</main></body></html>\n",
        escape_html(title)
    )
}

/// Loading view. `refresh_secs` makes the page reload itself so a
/// file-backed window picks up the next view.
pub fn render_loading_html(app_name: &str, refresh_secs: Option<u32>) -> String {
    let refresh = refresh_secs
        .map(|secs| format!("<meta http-equiv=\"refresh\" content=\"{secs}\">"))
        .unwrap_or_default();
    let body = format!(
        "<div class=\"spinner\"></div><h1 style=\"text-align:center\">Starting {}…</h1>\
<p style=\"text-align:center;color:#a3a8b8\">The dashboard opens as soon as the backend is ready.</p>",
        escape_html(app_name)
    );
    document(app_name, &refresh, &body)
}

/// Page that immediately navigates to `url`.
pub fn render_redirect_html(url: &str) -> String {
    let url = escape_html(url);
    document(
        "Opening dashboard",
        &format!("<meta http-equiv=\"refresh\" content=\"0; url={url}\">"),
        &format!("<p>Opening <a href=\"{url}\">{url}</a>…</p>"),
    )
}

/// Error view with cause, hints, recent output and retry instructions.
pub fn render_error_html(page: &ErrorPage, refresh_secs: Option<u32>) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<h1>{}</h1><p class=\"cause\">{}</p>",
        escape_html(&page.title),
        escape_html(&page.cause)
    );

    if !page.hints.is_empty() {
        body.push_str("<h2>What you can do</h2><ol>");
        for hint in &page.hints {
            let _ = write!(body, "<li>{}</li>", escape_html(hint));
        }
        body.push_str("</ol>");
    }

    if !page.diagnostics.is_empty() {
        body.push_str("<h2>Recent backend output</h2><pre>");
        for line in &page.diagnostics {
            body.push_str(&escape_html(line));
            body.push('\n');
        }
        body.push_str("</pre>");
    }

    let _ = write!(
        body,
        "<div class=\"retry\"><strong>Retry:</strong> {}</div>",
        escape_html(RETRY_INSTRUCTIONS)
    );

    let refresh = refresh_secs
        .map(|secs| format!("<meta http-equiv=\"refresh\" content=\"{secs}\">"))
        .unwrap_or_default();
    document(&page.title, &refresh, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirlian_core::FailureCategory;

    fn page() -> ErrorPage {
        ErrorPage {
            title: "A required package is missing".to_string(),
            cause: "Backend reported <stderr> & \"quotes\"".to_string(),
            category: FailureCategory::MissingDependency,
            hints: vec!["pip install -r requirements.txt".to_string()],
            diagnostics: vec!["<script>alert(1)</script>".to_string()],
        }
    }

    #[test]
    fn error_page_escapes_everything() {
        let html = render_error_html(&page(), None);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("&lt;stderr&gt; &amp; &quot;quotes&quot;"));
        assert!(html.contains("pip install -r requirements.txt"));
        assert!(html.contains("Retry:"));
    }

    #[test]
    fn pages_are_self_contained() {
        let pages = [
            render_error_html(&page(), Some(2)),
            render_loading_html("Kirlian Platform", Some(1)),
        ];
        for html in pages {
            assert!(!html.contains("src="), "external resource in page");
            assert!(!html.contains("<link"), "external stylesheet in page");
            assert!(!html.contains("<script"), "script in page");
            assert!(html.contains("http-equiv=\"refresh\""));
        }
    }

    #[test]
    fn redirect_points_at_url() {
        let html = render_redirect_html("http://localhost:8502");
        assert!(html.contains("content=\"0; url=http://localhost:8502\""));
    }
}
