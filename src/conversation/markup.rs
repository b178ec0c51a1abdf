//! Markdown rendering and markup stripping for assistant replies.
//!
//! Replies are rendered once, before they are stored. Raw HTML in the model's
//! output is escaped rather than passed through, so stored content is safe to
//! display.

use pulldown_cmark::{html, Event, Options, Parser};
use scraper::Html;

/// Render markdown to safe-to-display HTML.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Text content of an HTML fragment (entities decoded, tags dropped).
pub fn strip_html(content: &str) -> String {
    let fragment = Html::parse_fragment(content);
    fragment.root_element().text().collect()
}

/// Number of whitespace-separated words in the plain text of `content`.
pub fn word_count(content: &str) -> usize {
    strip_html(content).split_whitespace().count()
}
