//! markdown -> display markup, re-rendered wholesale on every fragment.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// the sentence shown in place of results when an analysis fails.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "An error occurred while analyzing the code. Please check the console for details.";

/// what the display region understands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkupFormat {
    /// html for a dom container (wasm page).
    #[default]
    Html,
    /// flattened plain text for native text widgets.
    Text,
}

impl MarkupFormat {
    /// converts a complete markdown document. malformed markdown degrades to
    /// whatever the parser makes of it; nothing is rejected.
    pub fn convert(self, markdown: &str) -> String {
        match self {
            MarkupFormat::Html => markdown_to_html(markdown),
            MarkupFormat::Text => markdown_to_text(markdown),
        }
    }

    /// the fixed failure message in this format.
    pub fn error_markup(self) -> String {
        match self {
            MarkupFormat::Html => format!("<p class=\"error\">{ANALYSIS_FAILED_MESSAGE}</p>"),
            MarkupFormat::Text => ANALYSIS_FAILED_MESSAGE.to_string(),
        }
    }
}

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, parser_options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn ensure_newline(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    // one entry per open list: next ordinal for ordered lists, none for bullets
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::List(start)) => {
                ensure_newline(&mut out);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    ensure_newline(&mut out);
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                ensure_newline(&mut out);
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("- "),
                }
            }
            Event::End(TagEnd::Item) => ensure_newline(&mut out),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Table) => {
                ensure_newline(&mut out);
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::CodeBlock(_)) => ensure_newline(&mut out),
            Event::End(TagEnd::CodeBlock) => {
                ensure_newline(&mut out);
                out.push('\n');
            }
            Event::End(TagEnd::TableRow | TagEnd::TableHead) => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push('\t'),
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_newline(&mut out);
                out.push_str("----\n\n");
            }
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    out.truncate(out.trim_end().len());
    out
}

/// accumulates streamed fragments and keeps the rendered view of the whole
/// buffer. every push re-parses everything received so far.
#[derive(Clone, Debug, Default)]
pub struct IncrementalRenderer {
    format: MarkupFormat,
    buffer: String,
    output: String,
    renders: usize,
}

impl IncrementalRenderer {
    pub fn new(format: MarkupFormat) -> Self {
        Self { format, ..Default::default() }
    }

    pub fn format(&self) -> MarkupFormat {
        self.format
    }

    /// appends `fragment` and returns the markup for the full buffer.
    pub fn push(&mut self, fragment: &str) -> &str {
        self.buffer.push_str(fragment);
        self.output = self.format.convert(&self.buffer);
        self.renders += 1;
        &self.output
    }

    /// raw markdown received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// markup from the latest render (empty before the first fragment).
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.output.clear();
        self.renders = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn html_heading_and_paragraph() {
        let html = MarkupFormat::Html.convert("# Analysis\n\nThis code loops 10 times.");
        assert_eq!(html, "<h1>Analysis</h1>\n<p>This code loops 10 times.</p>\n");
    }

    #[test]
    fn each_push_renders_the_whole_prefix() {
        let fragments = ["# Ana", "lysis\n\nThis ", "code loops 10 times."];
        let mut r = IncrementalRenderer::new(MarkupFormat::Html);
        let mut seen = String::new();
        for (k, f) in fragments.iter().enumerate() {
            seen.push_str(f);
            let out = r.push(f).to_string();
            assert_eq!(out, MarkupFormat::Html.convert(&seen));
            assert_eq!(r.renders(), k + 1);
        }
        assert_eq!(r.buffer(), "# Analysis\n\nThis code loops 10 times.");
    }

    #[test]
    fn text_flattening_keeps_structure() {
        let md = "# Title\n\nSome *emphasis* and `code`.\n\n- one\n- two\n\n1. first\n2. second\n\n```rust\nfn main() {}\n```\n";
        let text = MarkupFormat::Text.convert(md);
        assert_eq!(
            text,
            "Title\n\nSome emphasis and code.\n\n- one\n- two\n\n1. first\n2. second\n\nfn main() {}"
        );
    }

    #[test]
    fn nested_lists_indent() {
        let text = MarkupFormat::Text.convert("- outer\n  - inner\n- back\n");
        assert_eq!(text, "- outer\n  - inner\n- back");
    }

    #[test]
    fn unterminated_markup_degrades_without_error() {
        // mid-stream buffers often end inside a fence or emphasis
        let html = MarkupFormat::Html.convert("```py\nprint(1");
        assert!(html.contains("print(1"));
        let text = MarkupFormat::Text.convert("**bold but never closed");
        assert_eq!(text, "**bold but never closed");
    }

    #[test]
    fn error_markup_per_format() {
        assert_eq!(
            MarkupFormat::Html.error_markup(),
            "<p class=\"error\">An error occurred while analyzing the code. Please check the console for details.</p>"
        );
        assert_eq!(MarkupFormat::Text.error_markup(), ANALYSIS_FAILED_MESSAGE);
    }

    #[test]
    fn reset_clears_buffer_and_count() {
        let mut r = IncrementalRenderer::new(MarkupFormat::Text);
        r.push("hello");
        r.reset();
        assert_eq!(r.buffer(), "");
        assert_eq!(r.output(), "");
        assert_eq!(r.renders(), 0);
    }
}
