//! Command-line tokenizing.
//!
//! Arguments use the `--name:value`, `-name:value` and `/name:value` forms.
//! Anything without a flag prefix is a bare positional value.

use std::collections::HashMap;

/// One argument split into flag prefix, name and value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineParameter {
    /// `--`, `-`, `/`, or empty for a bare value.
    pub flag: String,
    pub name: String,
    pub value: String,
}

impl CommandLineParameter {
    /// Split a single argument into its parts.
    ///
    /// The name/value separator is the first `:` after the flag; a `:` right
    /// after the flag does not split and stays part of the name.
    pub fn parse(text: &str) -> Self {
        let (flag, rest) = if let Some(rest) = text.strip_prefix("--") {
            ("--", rest)
        } else if let Some(rest) = text.strip_prefix('-') {
            ("-", rest)
        } else if let Some(rest) = text.strip_prefix('/') {
            ("/", rest)
        } else {
            return Self {
                value: text.to_string(),
                ..Self::default()
            };
        };

        let (name, value) = match rest.find(':') {
            Some(pos) if pos > 0 => (&rest[..pos], &rest[pos + 1..]),
            _ => (rest, ""),
        };

        Self {
            flag: flag.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn is_flagged(&self) -> bool {
        !self.flag.is_empty()
    }

    /// Whether this flag asks for usage text (`?` or `help`).
    pub fn is_help(&self) -> bool {
        self.is_flagged() && (self.name == "?" || self.name == "help")
    }
}

impl From<&str> for CommandLineParameter {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl std::fmt::Display for CommandLineParameter {
    /// `value`, `flag+name`, or `flag+name:value`; double-quoted when the
    /// result contains a space.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = if self.flag.is_empty() {
            self.value.clone()
        } else if self.value.is_empty() {
            format!("{}{}", self.flag, self.name)
        } else {
            format!("{}{}:{}", self.flag, self.name, self.value)
        };

        if text.contains(' ') {
            write!(f, "\"{text}\"")
        } else {
            f.write_str(&text)
        }
    }
}

/// A fully tokenized command line.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    all: Vec<CommandLineParameter>,
    values: Vec<String>,
    parameters: HashMap<String, CommandLineParameter>,
    help_requested: bool,
}

impl CommandLine {
    /// Tokenize every argument in order.
    ///
    /// When a flag name repeats, the first occurrence is the one found by
    /// [`get`](Self::get); every occurrence stays in [`all`](Self::all).
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cmdline = Self::default();
        for arg in args {
            let param = CommandLineParameter::parse(arg.as_ref());
            if param.is_flagged() {
                if param.is_help() {
                    cmdline.help_requested = true;
                }
                cmdline
                    .parameters
                    .entry(param.name.clone())
                    .or_insert_with(|| param.clone());
            } else {
                cmdline.values.push(param.value.clone());
            }
            cmdline.all.push(param);
        }
        cmdline
    }

    /// Every parameter, in command-line order.
    pub fn all(&self) -> &[CommandLineParameter] {
        &self.all
    }

    /// Bare values (no flag), in order.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// First flagged parameter with this name.
    pub fn get(&self, name: &str) -> Option<&CommandLineParameter> {
        self.parameters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    /// Distinct flag names seen.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    /// Number of distinct flagged parameters.
    pub fn flag_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn help_requested(&self) -> bool {
        self.help_requested
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
