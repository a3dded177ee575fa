//! Ordered argument lists for external tools
//!
//! Order matters: the linker resolves symbols left to right and compilers let
//! later flags override earlier ones, so every mutation here preserves the
//! relative order of what is already in the list.

use std::fmt;

/// An ordered, owned sequence of command-line tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<String>,
}

impl ArgList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the tail
    pub fn append(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Insert at the head
    pub fn prepend(&mut self, arg: impl Into<String>) {
        self.args.insert(0, arg.into());
    }

    /// Append `arg` unless an identical token is already present
    pub fn ensure_present(&mut self, arg: &str) {
        if !self.contains(arg) {
            self.append(arg);
        }
    }

    /// Append `prefix + item` for every item of `from`, in order
    pub fn concat_with_prefix<I, S>(&mut self, prefix: &str, from: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in from {
            self.append(format!("{}{}", prefix, item.as_ref()));
        }
    }

    /// Append every whitespace-separated word of `text`
    pub fn extend_words(&mut self, text: &str) {
        for word in text.split_ascii_whitespace() {
            self.append(word);
        }
    }

    /// Append the fields of a separator-delimited spec.
    ///
    /// The first character of `spec` is the separator, so `",-O2,-Wall"`
    /// yields `-O2` and `-Wall`. Empty fields are skipped.
    pub fn extend_separated(&mut self, spec: &str) {
        let mut chars = spec.chars();
        let Some(sep) = chars.next() else {
            return;
        };
        for field in chars.as_str().split(sep) {
            if !field.is_empty() {
                self.append(field);
            }
        }
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.args.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }
}

impl<S: Into<String>> FromIterator<S> for ArgList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for ArgList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.args.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a ArgList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}

impl fmt::Display for ArgList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}
