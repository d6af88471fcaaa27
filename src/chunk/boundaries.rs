//! Break point detection for chunking

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Line boundary
    Line = 2,
    /// Paragraph boundary (highest)
    Paragraph = 3,
}

impl BreakPriority {
    /// Classify the break that would fall just after `chars[pos - 1]`
    fn at(chars: &[char], pos: usize) -> Option<Self> {
        match chars.get(pos.checked_sub(1)?)? {
            '\n' if pos >= 2 && chars[pos - 2] == '\n' => Some(BreakPriority::Paragraph),
            '\n' => Some(BreakPriority::Line),
            c if c.is_whitespace() => Some(BreakPriority::Word),
            _ => None,
        }
    }
}

/// A potential break point in text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakPoint {
    /// Character position; the chunk ends just before it
    pub position: usize,
    /// Priority of this break point
    pub priority: BreakPriority,
}

/// Best place to end a window that spans `chars[start..end]`.
///
/// Only the second half of the window is searched so chunks never shrink
/// below half the window size. Among candidates the highest priority wins,
/// and within a priority the latest position wins.
pub fn find_best_break(chars: &[char], start: usize, end: usize) -> Option<BreakPoint> {
    let floor = start + std::cmp::max((end - start) / 2, 1);

    let mut best: Option<BreakPoint> = None;
    for position in (floor..=end).rev() {
        let Some(priority) = BreakPriority::at(chars, position) else {
            continue;
        };
        if best.map_or(true, |b| priority > b.priority) {
            best = Some(BreakPoint { position, priority });
            if priority == BreakPriority::Paragraph {
                break;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_break_priority_ordering() {
        assert!(BreakPriority::Paragraph > BreakPriority::Line);
        assert!(BreakPriority::Line > BreakPriority::Word);
    }

    #[test]
    fn test_prefers_paragraph_over_later_space() {
        let text = chars("aaaa aaaa\n\nbbbb bbbb cc");
        let bp = find_best_break(&text, 0, text.len()).unwrap();
        assert_eq!(bp.priority, BreakPriority::Paragraph);
        assert_eq!(bp.position, 11);
    }

    #[test]
    fn test_falls_back_to_latest_space() {
        let text = chars("aaaa bbbb cccc dddd");
        let bp = find_best_break(&text, 0, text.len()).unwrap();
        assert_eq!(bp.priority, BreakPriority::Word);
        assert_eq!(bp.position, 15);
    }

    #[test]
    fn test_ignores_breaks_in_first_half() {
        let text = chars("a\n\nbbbbbbbbbbbbbbbbbbbb");
        assert!(find_best_break(&text, 0, text.len()).is_none());
    }
}
