//! Mark-as-read decision and the report line that goes with it.

use crate::github::ItemState;
use crate::pipeline::reference::ItemRef;

/// Longest subject, in characters, shown in a report line.
pub const SUBJECT_WIDTH: usize = 80;

/// Appended to subjects that had to be shortened.
pub const ELLIPSIS: &str = "…";

/// A notification is done with once its item is closed or merged.
pub fn should_mark_seen(state: Option<&ItemState>) -> bool {
    matches!(state, Some(ItemState::Closed | ItemState::Merged))
}

/// Report line printed when a message is flagged.
///
/// `mark message 'Subject' as seen because owner/repo#1 is merged`
pub fn seen_notice(subject: &str, item: &ItemRef, state: &ItemState) -> String {
    let subject = quote(&shorten(subject, SUBJECT_WIDTH));
    format!("mark message {subject} as seen because {item} is {state}")
}

/// Collapse whitespace and cut at a word boundary so the result, including
/// the trailing ellipsis, fits in `width` characters.
pub fn shorten(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let collapsed = words.join(" ");
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(ELLIPSIS.chars().count());
    let mut out = String::new();
    let mut used = 0;
    for word in &words {
        let sep = usize::from(!out.is_empty());
        let len = word.chars().count();
        if used + sep + len > budget {
            break;
        }
        if sep == 1 {
            out.push(' ');
        }
        out.push_str(word);
        used += sep + len;
    }

    out.push_str(ELLIPSIS);
    out
}

/// Quote a subject for display: single quotes unless the text contains a
/// single quote and no double quote. Control characters are escaped so a
/// subject cannot drive the terminal.
fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&escape_control(c)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

fn escape_control(c: char) -> String {
    match u32::from(c) {
        n @ 0..=0xff => format!("\\x{n:02x}"),
        n @ 0x100..=0xffff => format!("\\u{n:04x}"),
        n => format!("\\U{n:08x}"),
    }
}
