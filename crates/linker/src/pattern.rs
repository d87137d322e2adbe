use regex::Regex;

/// One ticket id found in a text node. Offsets are byte offsets into the
/// node's data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketMatch {
    pub ticket_id: String,
    pub start: usize,
    pub end: usize,
}

/// Matches runs of at least `min_len` ASCII digits that are bounded on both
/// sides by a non-word character (or the edge of the text). Word characters
/// are `[A-Za-z0-9_]`, so `x1234567y` holds no ticket id while `(1234567)`
/// does.
#[derive(Clone, Debug)]
pub struct TicketPattern {
    run: Regex,
    min_len: usize,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl TicketPattern {
    pub fn new(min_len: usize) -> Result<Self, regex::Error> {
        // Greedy from the leftmost digit, so every match is a maximal digit run.
        let run = Regex::new(&format!("[0-9]{{{min_len},}}"))?;
        Ok(Self { run, min_len })
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn find_all(&self, text: &str) -> Vec<TicketMatch> {
        let bytes = text.as_bytes();
        self.run
            .find_iter(text)
            .filter(|m| {
                let before_ok = m.start() == 0 || !is_word_byte(bytes[m.start() - 1]);
                let after_ok = m.end() == bytes.len() || !is_word_byte(bytes[m.end()]);
                before_ok && after_ok
            })
            .map(|m| TicketMatch {
                ticket_id: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    /// Whether `text` holds a digit run of the minimum length, bounded or not.
    pub fn has_digit_run(&self, text: &str) -> bool {
        self.run.is_match(text)
    }
}

pub fn contains_digit(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(text: &str) -> Vec<String> {
        TicketPattern::new(5)
            .unwrap()
            .find_all(text)
            .into_iter()
            .map(|m| m.ticket_id)
            .collect()
    }

    #[test]
    fn respects_minimum_length() {
        assert_eq!(ids("12345"), vec!["12345"]);
        assert!(ids("1234").is_empty());
        assert_eq!(ids("1234567890"), vec!["1234567890"]);
    }

    #[test]
    fn requires_word_boundaries() {
        assert!(ids("a12345").is_empty());
        assert!(ids("12345b").is_empty());
        assert!(ids("_12345").is_empty());
        assert_eq!(ids("a 12345"), vec!["12345"]);
        assert_eq!(ids("#12345,67890."), vec!["12345", "67890"]);
    }

    #[test]
    fn non_ascii_neighbours_count_as_boundaries() {
        assert_eq!(ids("é12345ü"), vec!["12345"]);
    }

    #[test]
    fn reports_byte_offsets() {
        let pattern = TicketPattern::new(5).unwrap();
        let found = pattern.find_all("See 98765 and 43210");
        assert_eq!(
            found,
            vec![
                TicketMatch {
                    ticket_id: "98765".into(),
                    start: 4,
                    end: 9
                },
                TicketMatch {
                    ticket_id: "43210".into(),
                    start: 14,
                    end: 19
                },
            ]
        );
    }

    #[test]
    fn digit_run_check_ignores_boundaries() {
        let pattern = TicketPattern::new(5).unwrap();
        assert!(pattern.has_digit_run("x12345y"));
        assert!(!pattern.has_digit_run("1234 5"));
        assert!(contains_digit("v2"));
        assert!(!contains_digit("none"));
    }
}
