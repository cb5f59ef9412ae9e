// Markdown rendering module: turns an assignment body into the HTML that
// Canvas stores as the assignment description. LaTeX math written as
// `\(...\)` or `\[...\]` is lifted out before conversion and put back
// afterwards, so the Markdown parser never sees (and never escapes) it.

use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use std::sync::OnceLock;

const PLACEHOLDER_PREFIX: &str = "MATHSPAN";
const PLACEHOLDER_SUFFIX: &str = "END";

/// Inline math is a single-line `\(...\)`; display math `\[...\]` may span
/// several lines. Both are matched non-greedily.
fn math_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\\[(?s:.*?)\\\]|\\\(.*?\\\)").expect("math span regex"))
}

/// Convert Markdown to HTML while keeping every math span byte-for-byte.
pub fn render_markdown(markdown: &str) -> String {
    let (protected, spans) = protect_math(markdown);
    let html = to_html(&protected.text);
    restore_math(html, &protected.prefix, &spans)
}

/// Markdown with math spans swapped out for placeholder tokens.
struct Protected {
    text: String,
    prefix: String,
}

fn protect_math(markdown: &str) -> (Protected, Vec<String>) {
    // Grow the prefix until it cannot clash with anything the author wrote.
    let mut prefix = PLACEHOLDER_PREFIX.to_string();
    while markdown.contains(&prefix) {
        prefix.push('X');
    }

    let mut spans = Vec::new();
    let text = math_span()
        .replace_all(markdown, |caps: &regex::Captures| {
            spans.push(caps[0].to_string());
            placeholder(&prefix, spans.len() - 1)
        })
        .into_owned();

    (Protected { text, prefix }, spans)
}

fn restore_math(mut html: String, prefix: &str, spans: &[String]) -> String {
    for (index, span) in spans.iter().enumerate() {
        html = html.replace(&placeholder(prefix, index), span);
    }
    html
}

fn placeholder(prefix: &str, index: usize) -> String {
    format!("{prefix}{index}{PLACEHOLDER_SUFFIX}")
}

fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_markdown_is_untouched_by_math_protection() {
        let md = "# Title\n\nSome *italic* text.";
        let html = render_markdown(md);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>italic</em>"));
        assert_eq!(html, to_html(md));
    }

    #[test]
    fn inline_math_keeps_underscores_and_carets() {
        let html = render_markdown("Solve \\(x^2 + y_1\\) and \\(a_1 * b_2 * c_3\\).");
        assert!(html.contains("\\(x^2 + y_1\\)"));
        assert!(html.contains("\\(a_1 * b_2 * c_3\\)"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn display_math_may_span_lines() {
        let md = "Before\n\n\\[\n\\sum_{i=1}^n a_i * b_i\n\\]\n\nAfter";
        let html = render_markdown(md);
        assert!(html.contains("\\[\n\\sum_{i=1}^n a_i * b_i\n\\]"));
        assert!(html.contains("<p>After</p>"));
    }

    #[test]
    fn author_text_resembling_a_placeholder_survives() {
        let md = "Literal MATHSPAN0END here and \\(z_0\\).";
        let html = render_markdown(md);
        assert!(html.contains("Literal MATHSPAN0END here"));
        assert!(html.contains("\\(z_0\\)"));
    }

    #[test]
    fn code_blocks_render_as_pre() {
        let html = render_markdown("```\nlet x = 1;\n```\n");
        assert!(html.contains("<pre><code>let x = 1;\n</code></pre>"));
    }
}
