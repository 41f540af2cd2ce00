//! Telegram HTML helpers.

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escaped_width(c: char) -> usize {
    match c {
        '&' => 5,
        '<' | '>' => 4,
        '"' => 6,
        _ => 1,
    }
}

/// Split plain text into HTML-escaped parts of at most `limit` characters each.
///
/// Lengths are measured after escaping, so an entity is never cut in half.
/// Cuts prefer a paragraph break, then a line break, then a space, as long as
/// the boundary keeps at least half of the part; otherwise the cut is hard.
pub fn split_escaped(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(6);
    let mut out = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut width = 0;
        let mut cut = rest.len();
        for (i, c) in rest.char_indices() {
            let w = escaped_width(c);
            if width + w > limit {
                cut = i;
                break;
            }
            width += w;
        }

        if cut == rest.len() {
            out.push(escape_html(rest));
            break;
        }

        let head = &rest[..cut];
        let min_keep = head.len() / 2;
        let split_at = head
            .rfind("\n\n")
            .map(|i| i + 2)
            .filter(|&i| i > min_keep)
            .or_else(|| head.rfind('\n').map(|i| i + 1).filter(|&i| i > min_keep))
            .or_else(|| head.rfind(' ').map(|i| i + 1).filter(|&i| i > min_keep))
            .unwrap_or(cut);

        let (part, tail) = rest.split_at(split_at);
        let part = part.trim_end();
        if !part.is_empty() {
            out.push(escape_html(part));
        }
        rest = tail.trim_start_matches('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        let s = "<b>\"x\" & y</b>";
        assert_eq!(
            escape_html(s),
            "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;"
        );
    }

    #[test]
    fn short_text_is_one_part() {
        assert_eq!(split_escaped("Привет, мир", 100), vec!["Привет, мир"]);
        assert!(split_escaped("", 100).is_empty());
    }

    #[test]
    fn splits_on_paragraphs_and_counts_chars() {
        let first = "а".repeat(30);
        let second = "б".repeat(30);
        let text = format!("{first}\n\n{second}");
        let parts = split_escaped(&text, 40);
        assert_eq!(parts, vec![first, second]);
    }

    #[test]
    fn long_word_is_hard_cut() {
        let text = "я".repeat(25);
        let parts = split_escaped(&text, 10);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn entities_are_never_cut() {
        let text = "&".repeat(7);
        let parts = split_escaped(&text, 12);
        assert!(parts.iter().all(|p| p.chars().count() <= 12));
        assert!(parts.iter().all(|p| p.len() % 5 == 0));
        assert_eq!(parts.concat(), "&amp;".repeat(7));
    }
}
