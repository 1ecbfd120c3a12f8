//! Fragment-state list parsing.

/// Parse a fragment-states string such as `[true, false]`, `true,false` or
/// `1 0`. Entries that are not a boolean are dropped.
pub fn parse_fragment_states(text: &str) -> Vec<bool> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);

    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|token| {
            let token = token.trim();
            if token.eq_ignore_ascii_case("true") || token == "1" {
                Some(true)
            } else if token.eq_ignore_ascii_case("false") || token == "0" {
                Some(false)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forms() {
        assert_eq!(parse_fragment_states("[true, false, true]"), vec![true, false, true]);
        assert_eq!(parse_fragment_states("true,false"), vec![true, false]);
        assert_eq!(parse_fragment_states("1 0 1"), vec![true, false, true]);
        assert_eq!(parse_fragment_states(" [TRUE,False] "), vec![true, false]);
    }

    #[test]
    fn test_junk_is_dropped() {
        assert_eq!(parse_fragment_states("[true, maybe, 0]"), vec![true, false]);
        assert!(parse_fragment_states("").is_empty());
        assert!(parse_fragment_states("[]").is_empty());
    }
}
