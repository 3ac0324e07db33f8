//! Line-based macro expansion run before parsing.
//!
//! Two macro forms: word substitution (`define`) and placeholder patterns
//! (`pattern`), where `$name` placeholders capture text and substitute into
//! a template:
//!
//! ```text
//! pattern("loop $n times", "for i from 0 while i < $n step 1")
//! ```

use std::sync::LazyLock;

use regex_automata::meta::Regex;
use regex_automata::{Anchored, Input};

use crate::error::GrammarError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$[a-zA-Z_][a-zA-Z0-9_]*").expect("placeholder pattern is valid")
});

struct WordMacro {
    regex: Regex,
    body: String,
}

impl WordMacro {
    fn new(name: &str, body: String) -> Result<WordMacro, GrammarError> {
        let pattern = format!(r"\b{}\b", regex_syntax::escape(name));
        let regex = Regex::new(&pattern).map_err(|err| GrammarError::Pattern {
            pattern,
            message: err.to_string(),
        })?;
        Ok(WordMacro { regex, body })
    }

    fn expand(&self, line: &str) -> Option<String> {
        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for found in self.regex.find_iter(line) {
            out.push_str(&line[last..found.start()]);
            out.push_str(&self.body);
            last = found.end();
        }
        if last == 0 {
            return None;
        }
        out.push_str(&line[last..]);
        Some(out)
    }
}

struct PatternMacro {
    placeholders: Vec<String>,
    regex: Regex,
    template: String,
}

impl PatternMacro {
    fn new(pattern: &str, template: String) -> Result<PatternMacro, GrammarError> {
        let placeholders: Vec<String> = PLACEHOLDER
            .find_iter(pattern)
            .map(|m| pattern[m.start() + 1..m.end()].to_owned())
            .collect();

        let mut escaped = regex_syntax::escape(pattern);
        for name in &placeholders {
            let needle = regex_syntax::escape(&format!("${name}"));
            escaped = escaped.replacen(&needle, "(.+?)", 1);
        }
        let regex = Regex::new(&escaped).map_err(|err| GrammarError::Pattern {
            pattern: escaped.clone(),
            message: err.to_string(),
        })?;

        Ok(PatternMacro {
            placeholders,
            regex,
            template,
        })
    }

    fn expand(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        let mut captures = self.regex.create_captures();
        self.regex.captures(
            Input::new(trimmed).anchored(Anchored::Yes),
            &mut captures,
        );
        let full = captures.get_match()?;
        if full.end() != trimmed.len() {
            return None;
        }

        let mut result = self.template.clone();
        for (index, name) in self.placeholders.iter().enumerate() {
            let captured = captures
                .get_group(index + 1)
                .map(|span| trimmed[span.start..span.end].trim())
                .unwrap_or("");
            result = result.replace(&format!("${name}"), captured);
        }
        Some(result)
    }
}

enum Expander {
    Word(WordMacro),
    Pattern(PatternMacro),
}

/// Applies registered macros to each source line, in registration order.
#[derive(Default)]
pub struct Preprocessor {
    macros: Vec<Expander>,
}

impl Preprocessor {
    pub fn new() -> Preprocessor {
        Preprocessor::default()
    }

    /// Register a whole-word substitution macro.
    pub fn define(
        &mut self,
        name: &str,
        body: impl Into<String>,
    ) -> Result<&mut Self, GrammarError> {
        self.macros
            .push(Expander::Word(WordMacro::new(name, body.into())?));
        Ok(self)
    }

    /// Register a placeholder pattern macro: `$name` placeholders capture
    /// text and substitute into the template.
    pub fn pattern(
        &mut self,
        pattern: &str,
        template: impl Into<String>,
    ) -> Result<&mut Self, GrammarError> {
        self.macros
            .push(Expander::Pattern(PatternMacro::new(pattern, template.into())?));
        Ok(self)
    }

    /// Expand macros over every line of the source.
    pub fn process(&self, source: &str) -> String {
        let mut out = Vec::new();
        for line in source.split('\n') {
            let mut current = line.to_owned();
            for expander in &self.macros {
                let expanded = match expander {
                    Expander::Word(word) => word.expand(&current),
                    Expander::Pattern(pattern) => pattern.expand(&current),
                };
                if let Some(next) = expanded {
                    current = next;
                }
            }
            out.push(current);
        }
        out.join("\n")
    }
}
