use std::collections::HashSet;
use std::fmt::Display;

/// One piece of a help line, optionally drawn in the help colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpSegment {
    pub text: String,
    pub highlighted: bool,
}

impl HelpSegment {
    pub fn plain(text: impl Into<String>) -> Self {
        HelpSegment {
            text: text.into(),
            highlighted: false,
        }
    }

    pub fn highlighted(text: impl Into<String>) -> Self {
        HelpSegment {
            text: text.into(),
            highlighted: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelpLine {
    Plain(String),
    Colored(Vec<HelpSegment>),
}

/// Help lines above a single input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptText {
    pub help: Vec<HelpLine>,
    pub input_line: String,
}

impl PromptText {
    pub fn new(input_line: impl Into<String>) -> Self {
        PromptText {
            help: Vec::new(),
            input_line: input_line.into(),
        }
    }

    pub fn with_help(mut self, line: HelpLine) -> Self {
        self.help.push(line);
        self
    }

    pub fn line_count(&self) -> usize {
        self.help.len() + 1
    }
}

/// The last line is the input line, every line above it is plain help.
impl From<&str> for PromptText {
    fn from(text: &str) -> Self {
        let mut lines: Vec<&str> = text.split('\n').collect();
        let input_line = lines.pop().unwrap_or_default().to_string();
        PromptText {
            help: lines.into_iter().map(|l| HelpLine::Plain(l.to_string())).collect(),
            input_line,
        }
    }
}

impl From<String> for PromptText {
    fn from(text: String) -> Self {
        PromptText::from(text.as_str())
    }
}

/// Assigns each name a distinct shortcut.
///
/// Candidates are the first character lower and upper case, then the last
/// character lower and upper case. When all four are taken the last candidate
/// gets a number appended, counting up from 1 past 9 if needed, so every name
/// gets a shortcut. Empty names get the lowest free number.
pub fn assign_shortcuts<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut shortcuts = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        let (Some(first), Some(last)) = (name.chars().next(), name.chars().last()) else {
            let shortcut = (1..)
                .map(|n: usize| n.to_string())
                .find(|s| !taken.contains(s))
                .unwrap_or_default();
            taken.insert(shortcut.clone());
            shortcuts.push(shortcut);
            continue;
        };

        let candidates = [
            first.to_lowercase().to_string(),
            first.to_uppercase().to_string(),
            last.to_lowercase().to_string(),
            last.to_uppercase().to_string(),
        ];
        let shortcut = match candidates.iter().find(|c| !taken.contains(*c)) {
            Some(free) => free.clone(),
            None => {
                let base = &candidates[3];
                (1..)
                    .map(|n: usize| format!("{base}{n}"))
                    .find(|s| !taken.contains(s))
                    .unwrap_or_default()
            }
        };
        taken.insert(shortcut.clone());
        shortcuts.push(shortcut);
    }
    shortcuts
}

/// `"1:first 2:second ..."`
pub fn numbered_legend<S: AsRef<str>>(choices: &[S]) -> String {
    choices
        .iter()
        .enumerate()
        .map(|(idx, choice)| format!("{}:{}", idx + 1, choice.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn shortcut_legend<S: AsRef<str>>(shortcuts: &[String], choices: &[S]) -> String {
    shortcuts
        .iter()
        .zip(choices)
        .map(|(key, choice)| format!("{key}:{}", choice.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn dictionary_legend<V: Display>(entries: &[(String, V)]) -> String {
    entries
        .iter()
        .map(|(key, label)| format!("{key}:{label}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Breaks a legend longer than `max_width` once, at the first space at or
/// after its midpoint, or the last one before it.
pub fn wrap_legend(legend: &str, max_width: usize) -> String {
    let chars: Vec<char> = legend.chars().collect();
    if chars.len() <= max_width {
        return legend.to_string();
    }
    let middle = chars.len() / 2;
    let split = chars[middle..]
        .iter()
        .position(|&c| c == ' ')
        .map(|offset| middle + offset)
        .or_else(|| chars[..middle].iter().rposition(|&c| c == ' '));

    match split {
        Some(idx) => {
            let head: String = chars[..idx].iter().collect();
            let tail: String = chars[idx + 1..].iter().collect();
            format!("{head}\n{tail}")
        }
        None => legend.to_string(),
    }
}
