//! Blocking text-edit prompts and validation of what users type into them.

/// Modal text input supplied by the host.
pub trait Prompter {
    /// Shows `message` with `default` prefilled. `None` means the user cancelled.
    fn prompt(&mut self, message: &str, default: &str) -> Option<String>;

    fn alert(&mut self, message: &str);
}

pub const RENAME_PROMPT: &str = "Enter new value:";
pub const COLOUR_PROMPT: &str = "Enter new colour:";
pub const OPACITY_PROMPT: &str = "Enter new opacity (0-1):";
pub const BASE_PAIR_PROMPT: &str = "Enter new length (bp):";
pub const INVALID_VALUE: &str = "Invalid value, try again";

/// Prompts until `parse` accepts the answer, alerting after every rejected one. Returns `None`
/// once the user cancels.
pub fn prompt_until<T>(
    prompter: &mut dyn Prompter,
    message: &str,
    default: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    loop {
        let answer = prompter.prompt(message, default)?;
        match parse(answer.trim()) {
            Some(value) => return Some(value),
            None => {
                tracing::debug!(message, answer = %answer, "rejected prompt answer");
                prompter.alert(INVALID_VALUE);
            }
        }
    }
}

/// Opacity in `[0, 1]`.
pub fn parse_opacity(text: &str) -> Option<f64> {
    let value: f64 = text.parse().ok()?;
    (0.0..=1.0).contains(&value).then_some(value)
}

/// Positive whole number of base pairs.
pub fn parse_base_pair(text: &str) -> Option<i64> {
    let value: i64 = text.parse().ok()?;
    (value > 0).then_some(value)
}

/// Non-blank label text.
pub fn parse_label(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Colour string as accepted by SVG `fill`: `#rgb`/`#rrggbb`, a functional notation or a
/// keyword made of ASCII letters.
pub fn parse_colour(text: &str) -> Option<String> {
    let ok = if let Some(hex) = text.strip_prefix('#') {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(open) = text.find('(') {
        text.ends_with(')')
            && text[..open].chars().all(|c| c.is_ascii_alphabetic())
            && !text[..open].is_empty()
    } else {
        !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic())
    };
    ok.then(|| text.to_string())
}

/// Answers prompts from a fixed list, recording every message shown. Useful for headless hosts
/// and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<Option<String>>,
    pub prompts: Vec<String>,
    pub alerts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(|a| a.map(Into::into)).collect(),
            prompts: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&mut self, message: &str, _default: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front().flatten()
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opacity_must_be_in_unit_interval() {
        assert_eq!(parse_opacity("0.25"), Some(0.25));
        assert_eq!(parse_opacity("1"), Some(1.0));
        assert_eq!(parse_opacity("1.5"), None);
        assert_eq!(parse_opacity("-0.1"), None);
        assert_eq!(parse_opacity("abc"), None);
    }

    #[test]
    fn base_pair_must_be_positive_integer() {
        assert_eq!(parse_base_pair("1000"), Some(1000));
        assert_eq!(parse_base_pair("0"), None);
        assert_eq!(parse_base_pair("2.5"), None);
    }

    #[test]
    fn colours() {
        assert!(parse_colour("#ff0000").is_some());
        assert!(parse_colour("#f00").is_some());
        assert!(parse_colour("rgb(1, 2, 3)").is_some());
        assert!(parse_colour("steelblue").is_some());
        assert!(parse_colour("#ggg").is_none());
        assert!(parse_colour("").is_none());
        assert!(parse_colour("red; x").is_none());
    }

    #[test]
    fn prompt_until_reprompts_after_invalid_answers() {
        let mut prompter = ScriptedPrompter::new([Some("2"), Some("x"), Some("0.4")]);
        let value = prompt_until(&mut prompter, OPACITY_PROMPT, "1", parse_opacity);
        assert_eq!(value, Some(0.4));
        assert_eq!(prompter.prompts.len(), 3);
        assert_eq!(prompter.alerts, [INVALID_VALUE, INVALID_VALUE]);

        let mut prompter = ScriptedPrompter::new([Some("2"), None::<&str>]);
        assert_eq!(
            prompt_until(&mut prompter, OPACITY_PROMPT, "1", parse_opacity),
            None
        );
    }
}
