//! Markdown processing utilities.
//!
//! Uses pulldown-cmark for proper CommonMark parsing rather than regex-based
//! stripping. This handles edge cases (nested code blocks, HTML entities,
//! reference links) that regex approaches miss.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Strip markdown formatting, returning plain prose text.
///
/// Block boundaries (paragraphs, headings, list items, table rows) become
/// blank lines so the segmenter never joins two blocks into one sentence.
///
/// Removes:
/// - Code blocks (fenced and indented)
/// - Inline code
/// - HTML
/// - YAML frontmatter
/// - Image alt text
///
/// Preserves:
/// - Heading text, as its own paragraph
/// - Link text (the visible part)
/// - Blockquote, list item, and table cell text
/// - Emphasis/strong text (without markers)
#[tracing::instrument(skip_all, fields(input_len = text.len()))]
pub fn strip_to_prose(text: &str) -> String {
    let text = strip_frontmatter(text);

    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(text, options);

    let mut result = String::with_capacity(text.len());
    let mut skip_depth: usize = 0;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_) | Tag::Image { .. }) => skip_depth += 1,
            Event::End(TagEnd::CodeBlock | TagEnd::Image) => {
                skip_depth = skip_depth.saturating_sub(1);
            }

            Event::Text(t) if skip_depth == 0 => result.push_str(&t),
            Event::SoftBreak | Event::HardBreak if skip_depth == 0 => result.push(' '),
            Event::End(TagEnd::TableCell) if skip_depth == 0 => result.push(' '),

            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::TableRow
                | TagEnd::TableHead,
            ) if skip_depth == 0 => end_block(&mut result),

            _ => {}
        }
    }

    result.truncate(result.trim_end().len());
    result
}

/// Terminate the current block with a blank line, once.
fn end_block(out: &mut String) {
    let trimmed = out.trim_end_matches([' ', '\n']).len();
    if trimmed == 0 {
        out.clear();
        return;
    }
    out.truncate(trimmed);
    out.push_str("\n\n");
}

/// Strip YAML frontmatter delimited by `---` lines.
fn strip_frontmatter(text: &str) -> &str {
    let trimmed = text.trim_start();
    let Some(after_opening) = trimmed.strip_prefix("---") else {
        return text;
    };
    let Some(close_pos) = after_opening.find("\n---") else {
        return text;
    };

    let remainder = &after_opening[close_pos + 4..];
    remainder.strip_prefix('\n').unwrap_or(remainder)
}
