//! Runtime variable decoding
//!
//! The language runtime describes its installation when started with
//! `-dump-runtime-variables`. Each interesting line has the shape
//! `NAME=value;` where the value may be double-quoted:
//!
//! ```text
//! CC="gcc";
//! PLBASE="/usr/lib/swi-prolog";
//! PLLIBS="-lgmp -lm -lrt";
//! ```

/// Name/value pairs decoded from runtime output, in output order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeVariables {
    entries: Vec<(String, String)>,
}

impl RuntimeVariables {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the complete output of a runtime query
    pub fn parse(output: &str) -> Self {
        let entries = output.lines().filter_map(parse_line).collect();
        Self { entries }
    }

    /// Value of the first entry named `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Add an entry (later duplicates are shadowed by `get`)
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Iterate over entries in output order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode one `NAME=value` line.
///
/// The name runs up to the first `=`, the value up to the first `;` or the end
/// of the line. Both must be non-empty. A value opening with `"` ends at the
/// next `"` and loses trailing whitespace; unquoted values are kept verbatim.
fn parse_line(line: &str) -> Option<(String, String)> {
    let (name, rest) = line.split_once('=')?;
    if name.is_empty() {
        return None;
    }

    let raw = rest.split(';').next().unwrap_or("");
    if raw.is_empty() {
        return None;
    }

    let value = match raw.strip_prefix('"') {
        Some(quoted) => {
            let end = quoted.find('"').unwrap_or(quoted.len());
            quoted[..end].trim_end()
        }
        None => raw,
    };

    Some((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("CC=\"gcc\";", Some(("CC", "gcc")))]
    #[case("PLARCH=x86_64-linux;", Some(("PLARCH", "x86_64-linux")))]
    #[case("PLLIBS=\"-lgmp -lm \";", Some(("PLLIBS", "-lgmp -lm")))]
    #[case("PLBASE=\"/opt/pl", Some(("PLBASE", "/opt/pl")))]
    #[case("NAME=a;b", Some(("NAME", "a")))]
    #[case("=value", None)]
    #[case("EMPTY=;", None)]
    #[case("EMPTY=", None)]
    #[case("no equals sign", None)]
    fn test_parse_line(#[case] line: &str, #[case] expected: Option<(&str, &str)>) {
        let parsed = parse_line(line);
        let expected = expected.map(|(n, v)| (n.to_string(), v.to_string()));
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_unquoted_value_keeps_spaces() {
        assert_eq!(
            parse_line("PLLDFLAGS=-rdynamic -O2 ;"),
            Some(("PLLDFLAGS".to_string(), "-rdynamic -O2 ".to_string()))
        );
    }

    #[test]
    fn test_parse_output_preserves_order() {
        let vars = RuntimeVariables::parse(
            "CC=\"gcc\";\nPLBASE=\"/usr/lib/swi-prolog\";\n\nPLARCH=\"x86_64-linux\";\n",
        );
        let names: Vec<&str> = vars.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["CC", "PLBASE", "PLARCH"]);
        assert_eq!(vars.get("PLBASE"), Some("/usr/lib/swi-prolog"));
        assert_eq!(vars.get("PLLIBS"), None);
    }

    #[test]
    fn test_first_entry_wins() {
        let mut vars = RuntimeVariables::parse("CC=cc\n");
        vars.insert("CC", "clang");
        assert_eq!(vars.get("CC"), Some("cc"));
        assert_eq!(vars.len(), 2);
    }
}
