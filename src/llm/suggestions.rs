use crate::session::ChatTurn;

/// Number of trailing chat entries (three exchanges) fed back into suggestion prompts.
pub const HISTORY_WINDOW: usize = 6;

/// Splits raw backend output into one question per line.
///
/// Leading bullet characters (`-`, `.`, `*`, space) are stripped and lines that
/// end up empty are dropped. The count is not checked.
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim_start_matches(|c| matches!(c, '-' | '.' | '*' | ' '))
                .trim()
        })
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Renders the last [`HISTORY_WINDOW`] turns as `speaker: message` lines.
pub fn render_history(history: &[ChatTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker, turn.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;

    #[test]
    fn strips_bullets_and_drops_blank_lines() {
        assert_eq!(
            parse_suggestions("- Q1?\n* Q2?\n  Q3?\n\n"),
            vec!["Q1?", "Q2?", "Q3?"]
        );
    }

    #[test]
    fn keeps_numbering_digits() {
        // Only the bullet set is stripped; "1." keeps its digit.
        assert_eq!(parse_suggestions("1. First?\n. Second?"), vec!["1. First?", "Second?"]);
    }

    #[test]
    fn bullet_only_lines_are_dropped() {
        assert_eq!(parse_suggestions("-\n * \nReal?\r\n"), vec!["Real?"]);
    }

    #[test]
    fn empty_output_gives_empty_list() {
        assert!(parse_suggestions("").is_empty());
    }

    #[test]
    fn history_is_limited_to_last_six_entries() {
        let history: Vec<ChatTurn> = (0..8)
            .map(|i| {
                let speaker = if i % 2 == 0 { Speaker::User } else { Speaker::Assistant };
                ChatTurn::new(speaker, format!("m{}", i))
            })
            .collect();

        let rendered = render_history(&history);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "User: m2");
        assert_eq!(lines[5], "Assistant: m7");
    }
}
