use std::fmt::Write as _;

use kirlian_core::ErrorPage;

use super::RETRY_INSTRUCTIONS;

/// Plain-text error page for the terminal.
pub fn render_error_text(page: &ErrorPage) -> String {
    let mut out = String::new();
    let rule = "=".repeat(page.title.chars().count().clamp(20, 72));

    let _ = writeln!(out, "{rule}\n{}\n{rule}", page.title);
    let _ = writeln!(out, "{}\n", page.cause);

    if !page.hints.is_empty() {
        out.push_str("What you can do:\n");
        for (i, hint) in page.hints.iter().enumerate() {
            let _ = writeln!(out, "  {}. {hint}", i + 1);
        }
        out.push('\n');
    }

    if !page.diagnostics.is_empty() {
        out.push_str("Recent backend output:\n");
        for line in &page.diagnostics {
            let _ = writeln!(out, "  | {line}");
        }
        out.push('\n');
    }

    out.push_str(RETRY_INSTRUCTIONS);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kirlian_core::FailureCategory;

    #[test]
    fn text_page_lists_hints_and_output() {
        let page = ErrorPage {
            title: "The backend took too long to start".to_string(),
            cause: "Backend did not become ready within 30.0s".to_string(),
            category: FailureCategory::Timeout,
            hints: vec!["Retry once.".to_string(), "Raise the timeout.".to_string()],
            diagnostics: vec!["Collecting usage statistics".to_string()],
        };
        let text = render_error_text(&page);
        assert!(text.contains("  1. Retry once."));
        assert!(text.contains("  2. Raise the timeout."));
        assert!(text.contains("  | Collecting usage statistics"));
        assert!(text.ends_with(&format!("{RETRY_INSTRUCTIONS}\n")));
    }
}
