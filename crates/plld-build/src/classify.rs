//! Input classification by file extension

use crate::error::{BuildError, BuildResult};
use crate::platform::Platform;
use std::fmt;

/// Kind of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Object file or static archive, passed to the linker as is
    Object,
    /// C source file
    CSource,
    /// C++ source file
    CppSource,
    /// Import library (Windows)
    Library,
    /// Prolog source, consulted into the program image
    ScriptSource,
    /// Prolog quick-load file
    SerializedScript,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::CSource => write!(f, "C source"),
            Self::CppSource => write!(f, "C++ source"),
            Self::Library => write!(f, "library"),
            Self::ScriptSource => write!(f, "script source"),
            Self::SerializedScript => write!(f, "serialized script"),
        }
    }
}

/// Text after the last `.` of the final path segment
pub fn file_name_extension(path: &str, platform: Platform) -> Option<&str> {
    let segment = path
        .rsplit(|c: char| c == '/' || (platform.backslash_separator() && c == '\\'))
        .next()
        .unwrap_or(path);
    segment.rsplit_once('.').map(|(_, ext)| ext)
}

/// Replace the extension of the final path segment, or append one
pub fn replace_extension(path: &str, ext: &str, platform: Platform) -> String {
    match file_name_extension(path, platform) {
        Some(old) => format!("{}{}", &path[..path.len() - old.len()], ext),
        None => format!("{}.{}", path, ext),
    }
}

/// Classify a path; unknown or missing extensions are an error
pub fn classify(path: &str, platform: Platform) -> BuildResult<InputKind> {
    let ext = file_name_extension(path, platform).ok_or_else(|| BuildError::unrecognized(path))?;

    platform
        .extension_table()
        .iter()
        .find(|(known, _)| {
            if platform.case_insensitive() {
                known.eq_ignore_ascii_case(ext)
            } else {
                *known == ext
            }
        })
        .map(|(_, kind)| *kind)
        .ok_or_else(|| BuildError::unrecognized(path))
}

/// Input buckets, each in command-line order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inputs {
    /// Objects and archives; compiled objects are appended here as well
    pub objects: Vec<String>,
    pub c_sources: Vec<String>,
    pub cpp_sources: Vec<String>,
    /// Library files named directly on the command line
    pub libraries: Vec<String>,
    pub scripts: Vec<String>,
    pub serialized_scripts: Vec<String>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `path` and append it to its bucket
    pub fn add(&mut self, path: &str, platform: Platform) -> BuildResult<InputKind> {
        let kind = classify(path, platform)?;
        self.bucket_mut(kind).push(path.to_string());
        Ok(kind)
    }

    /// Classify every path; on any unrecognized path nothing is added
    pub fn classify_all<I, S>(paths: I, platform: Platform) -> BuildResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<S> = paths.into_iter().collect();
        let kinds = paths
            .iter()
            .map(|p| classify(p.as_ref(), platform))
            .collect::<BuildResult<Vec<_>>>()?;

        let mut inputs = Self::new();
        for (path, kind) in paths.iter().zip(kinds) {
            inputs.bucket_mut(kind).push(path.as_ref().to_string());
        }
        Ok(inputs)
    }

    /// Bucket holding files of `kind`
    pub fn bucket(&self, kind: InputKind) -> &[String] {
        match kind {
            InputKind::Object => &self.objects,
            InputKind::CSource => &self.c_sources,
            InputKind::CppSource => &self.cpp_sources,
            InputKind::Library => &self.libraries,
            InputKind::ScriptSource => &self.scripts,
            InputKind::SerializedScript => &self.serialized_scripts,
        }
    }

    fn bucket_mut(&mut self, kind: InputKind) -> &mut Vec<String> {
        match kind {
            InputKind::Object => &mut self.objects,
            InputKind::CSource => &mut self.c_sources,
            InputKind::CppSource => &mut self.cpp_sources,
            InputKind::Library => &mut self.libraries,
            InputKind::ScriptSource => &mut self.scripts,
            InputKind::SerializedScript => &mut self.serialized_scripts,
        }
    }

    /// Total number of classified files
    pub fn len(&self) -> usize {
        self.objects.len()
            + self.c_sources.len()
            + self.cpp_sources.len()
            + self.libraries.len()
            + self.scripts.len()
            + self.serialized_scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any file needs compiling
    pub fn has_sources(&self) -> bool {
        !self.c_sources.is_empty() || !self.cpp_sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("main.c", InputKind::CSource)]
    #[case("src/io.cpp", InputKind::CppSource)]
    #[case("a.cxx", InputKind::CppSource)]
    #[case("a.cc", InputKind::CppSource)]
    #[case("Widget.C", InputKind::CppSource)]
    #[case("lib/util.o", InputKind::Object)]
    #[case("libfoo.a", InputKind::Object)]
    #[case("app.pl", InputKind::ScriptSource)]
    #[case("boot.qlf", InputKind::SerializedScript)]
    #[case("dir.v2/x.c", InputKind::CSource)]
    fn test_classify_unix(#[case] path: &str, #[case] expected: InputKind) {
        assert_eq!(classify(path, Platform::Unix).unwrap(), expected);
    }

    #[rstest]
    #[case("MAIN.C", InputKind::CSource)]
    #[case("util.OBJ", InputKind::Object)]
    #[case("user32.lib", InputKind::Library)]
    #[case("dir.v2\\x.Cpp", InputKind::CppSource)]
    fn test_classify_windows(#[case] path: &str, #[case] expected: InputKind) {
        assert_eq!(classify(path, Platform::Windows).unwrap(), expected);
    }

    #[rstest]
    #[case("notes.xyz")]
    #[case("Makefile")]
    #[case("dir.d/noext")]
    #[case("trailing.")]
    #[case("main.PL")]
    #[case("foo.obj")]
    fn test_classify_unix_rejects(#[case] path: &str) {
        assert!(matches!(
            classify(path, Platform::Unix),
            Err(BuildError::UnrecognizedInput { .. })
        ));
    }

    #[test]
    fn test_extension_of_final_segment_only() {
        assert_eq!(file_name_extension("a.b/c", Platform::Unix), None);
        assert_eq!(file_name_extension("a.b/c.d", Platform::Unix), Some("d"));
        assert_eq!(file_name_extension("x.tar.gz", Platform::Unix), Some("gz"));
        assert_eq!(file_name_extension("a.b\\c", Platform::Unix), Some("b\\c"));
        assert_eq!(file_name_extension("a.b\\c", Platform::Windows), None);
    }

    #[test]
    fn test_replace_extension() {
        assert_eq!(replace_extension("src/main.c", "o", Platform::Unix), "src/main.o");
        assert_eq!(replace_extension("dir.d/noext", "o", Platform::Unix), "dir.d/noext.o");
        assert_eq!(replace_extension("ctmp-42", "exp", Platform::Windows), "ctmp-42.exp");
        assert_eq!(replace_extension("a\\b.cpp", "obj", Platform::Windows), "a\\b.obj");
    }

    #[test]
    fn test_classify_all_keeps_order() {
        let inputs =
            Inputs::classify_all(["b.c", "x.pl", "a.c", "m.o", "k.cc", "y.pl"], Platform::Unix)
                .unwrap();
        assert_eq!(inputs.c_sources, vec!["b.c", "a.c"]);
        assert_eq!(inputs.scripts, vec!["x.pl", "y.pl"]);
        assert_eq!(inputs.objects, vec!["m.o"]);
        assert_eq!(inputs.cpp_sources, vec!["k.cc"]);
        assert_eq!(inputs.len(), 6);
        assert!(inputs.has_sources());
    }

    #[test]
    fn test_classify_all_rejects_without_mutation() {
        let err = Inputs::classify_all(["a.c", "b.xyz"], Platform::Unix).unwrap_err();
        assert!(err.to_string().contains("b.xyz"));
    }

    #[test]
    fn test_add_rejects_without_mutation() {
        let mut inputs = Inputs::new();
        inputs.add("a.c", Platform::Unix).unwrap();
        assert!(inputs.add("b.xyz", Platform::Unix).is_err());
        assert_eq!(inputs.len(), 1);
    }

    fn any_name() -> impl Strategy<Value = String> {
        (
            "[a-z]{1,6}",
            proptest::sample::select(vec![
                "o", "a", "c", "cpp", "cxx", "cc", "C", "pl", "qlf", "xyz", "h", "",
            ]),
        )
            .prop_map(|(stem, ext)| {
                if ext.is_empty() {
                    stem
                } else {
                    format!("{}.{}", stem, ext)
                }
            })
    }

    proptest! {
        #[test]
        fn prop_classification_total_and_exclusive(names in proptest::collection::vec(any_name(), 0..16)) {
            let all_known = names.iter().all(|n| classify(n, Platform::Unix).is_ok());
            match Inputs::classify_all(&names, Platform::Unix) {
                Ok(inputs) => {
                    prop_assert!(all_known);
                    prop_assert_eq!(inputs.len(), names.len());
                    for name in &names {
                        let kind = classify(name, Platform::Unix).unwrap();
                        prop_assert!(inputs.bucket(kind).contains(name));
                    }
                }
                Err(_) => prop_assert!(!all_known),
            }
        }
    }
}
