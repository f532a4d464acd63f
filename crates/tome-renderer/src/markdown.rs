//! Markdown to HTML conversion.

use pulldown_cmark::{Options, Parser, html};

/// Markdown renderer producing HTML fragments.
///
/// GitHub Flavored Markdown extensions are enabled by default.
#[derive(Clone, Copy, Debug)]
pub struct MarkdownRenderer {
    gfm: bool,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Create a new renderer with GFM enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { gfm: true }
    }

    /// Enable or disable GitHub Flavored Markdown features.
    ///
    /// When enabled, the parser supports:
    /// - Tables
    /// - Strikethrough (`~~text~~`)
    /// - Task lists (`- [ ] item`)
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render markdown text to an HTML string.
    #[must_use]
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.parser_options());
        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, parser);
        output
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_render_heading() {
        assert_eq!(MarkdownRenderer::new().render("## item1"), "<h2>item1</h2>\n");
    }

    #[test]
    fn test_render_paragraph_and_emphasis() {
        let html = MarkdownRenderer::new().render("Mf **quote**");
        assert_eq!(html, "<p>Mf <strong>quote</strong></p>\n");
    }

    #[test]
    fn test_render_gfm_table() {
        let html = MarkdownRenderer::new().render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_render_without_gfm_keeps_strikethrough_literal() {
        let html = MarkdownRenderer::new().with_gfm(false).render("~~gone~~");
        assert!(!html.contains("<del>"));
    }

    #[test]
    fn test_render_empty_input() {
        assert_eq!(MarkdownRenderer::new().render(""), "");
    }
}
