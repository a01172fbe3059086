//! Stored-name derivation.
//!
//! Everything here is a pure string transform: nothing touches the
//! filesystem or the network. Names use POSIX separators throughout;
//! backslashes are rewritten by [`clean_name`] before they can reach a
//! backend.

use uuid::Uuid;

/// Suffix length used when none (or zero) is configured.
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// Length of the token appended by [`alternative_name`].
pub const ALTERNATIVE_TOKEN_LEN: usize = 7;

/// Name handed to [`create_file_name`].
///
/// A split name is a `(root, extension)` pair, concatenated before the
/// random prefix is added so the extension stays adjacent to its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseName<'a> {
    /// Full name, e.g. `uploads/report.pdf`.
    Whole(&'a str),
    /// Root and extension, e.g. `("uploads/report", ".pdf")`.
    Split {
        /// Name without extension.
        root: &'a str,
        /// Extension including the leading dot.
        ext: &'a str,
    },
}

impl BaseName<'_> {
    fn joined(self) -> String {
        match self {
            Self::Whole(name) => name.to_string(),
            Self::Split { root, ext } => format!("{root}{ext}"),
        }
    }
}

impl<'a> From<&'a str> for BaseName<'a> {
    fn from(name: &'a str) -> Self {
        Self::Whole(name)
    }
}

impl<'a> From<&'a String> for BaseName<'a> {
    fn from(name: &'a String) -> Self {
        Self::Whole(name.as_str())
    }
}

impl<'a> From<(&'a str, &'a str)> for BaseName<'a> {
    fn from((root, ext): (&'a str, &'a str)) -> Self {
        Self::Split { root, ext }
    }
}

/// Resolve a configured suffix length: unset or zero means the default.
#[must_use]
pub fn effective_suffix_len(configured: Option<usize>) -> usize {
    match configured {
        Some(len) if len > 0 => len,
        _ => DEFAULT_SUFFIX_LEN,
    }
}

/// Random lowercase hex string of exactly `len` characters.
#[must_use]
pub fn random_hex(len: usize) -> String {
    let mut hex = String::with_capacity(len + 32);
    while hex.len() < len {
        hex.push_str(&Uuid::new_v4().simple().to_string());
    }
    hex.truncate(len);
    hex
}

/// Prefix the leaf of `base` with a random hex suffix.
///
/// The directory part is preserved; only the last path segment changes.
#[must_use]
pub fn create_file_name<'a>(base: impl Into<BaseName<'a>>, suffix_len: Option<usize>) -> String {
    let suffix = random_hex(effective_suffix_len(suffix_len));
    create_file_name_with_suffix(base, &suffix)
}

/// Deterministic core of [`create_file_name`].
#[must_use]
pub fn create_file_name_with_suffix<'a>(base: impl Into<BaseName<'a>>, suffix: &str) -> String {
    let name = base.into().joined();
    let (dir, leaf) = split_name(&name);
    join_name(dir, &format!("{suffix}{leaf}"))
}

/// Lexically normalize `name`: forward slashes only, `.` dropped, `..`
/// resolved, repeated separators collapsed. An empty result is `.`.
#[must_use]
pub fn clean_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    let absolute = name.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Strip leading and trailing separators, producing an object key.
#[must_use]
pub fn safe_join(name: &str) -> String {
    name.trim_matches('/').to_string()
}

/// True when a cleaned name stays inside its namespace root.
#[must_use]
pub fn is_contained(name: &str) -> bool {
    !(name.starts_with('/') || name == ".." || name.starts_with("../"))
}

/// Split into `(directory, leaf)`; the directory is empty for bare names.
#[must_use]
pub fn split_name(name: &str) -> (&str, &str) {
    name.rsplit_once('/').unwrap_or(("", name))
}

/// Join a directory and a leaf with a single `/`.
#[must_use]
pub fn join_name(dir: &str, leaf: &str) -> String {
    if dir.is_empty() {
        leaf.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{leaf}")
    } else {
        format!("{dir}/{leaf}")
    }
}

/// POSIX-style join: an absolute `name` replaces `base`.
#[must_use]
pub fn posix_join(base: &str, name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        join_name(base, name)
    }
}

/// Split a leaf into stem and extension (`.tar.gz` keeps only `.gz`).
/// Dotfiles such as `.env` have no extension.
#[must_use]
pub fn split_extension(leaf: &str) -> (&str, &str) {
    match leaf.rfind('.') {
        Some(idx) if idx > 0 => leaf.split_at(idx),
        _ => (leaf, ""),
    }
}

/// Name used when `name` is already taken on a filesystem:
/// `dir/stem_<token>.ext`.
#[must_use]
pub fn alternative_name(name: &str, token: &str) -> String {
    let (dir, leaf) = split_name(name);
    let (stem, ext) = split_extension(leaf);
    join_name(dir, &format!("{stem}_{token}{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    }

    #[rstest]
    #[case(None, 6)]
    #[case(Some(0), 6)]
    #[case(Some(4), 4)]
    #[case(Some(40), 40)]
    fn test_effective_suffix_len(#[case] configured: Option<usize>, #[case] expected: usize) {
        assert_eq!(effective_suffix_len(configured), expected);
    }

    #[test]
    fn test_random_hex_length_and_alphabet() {
        for len in [0, 1, 6, 32, 33, 70] {
            let hex = random_hex(len);
            assert_eq!(hex.len(), len);
            assert!(is_lower_hex(&hex));
        }
    }

    #[test]
    fn test_create_file_name_prefixes_leaf_only() {
        let name = create_file_name_with_suffix("uploads/report.pdf", "abcd");
        assert_eq!(name, "uploads/abcdreport.pdf");

        let bare = create_file_name_with_suffix("report.pdf", "abcd");
        assert_eq!(bare, "abcdreport.pdf");
    }

    #[test]
    fn test_create_file_name_split_keeps_extension_adjacent() {
        let name = create_file_name_with_suffix(("photos/cat", ".jpg"), "0f0f");
        assert_eq!(name, "photos/0f0fcat.jpg");
    }

    #[test]
    fn test_create_file_name_random_suffix() {
        let name = create_file_name("uploads/report.pdf", Some(4));
        let (dir, leaf) = split_name(&name);
        assert_eq!(dir, "uploads");
        assert!(leaf.ends_with("report.pdf"));
        assert!(is_lower_hex(&leaf[..4]));
        assert_eq!(leaf.len(), "report.pdf".len() + 4);
    }

    #[test]
    fn test_create_file_name_default_length() {
        let name = create_file_name("a.txt", None);
        assert_eq!(name.len(), "a.txt".len() + DEFAULT_SUFFIX_LEN);
    }

    #[rstest]
    #[case("a/b/c.txt", "a/b/c.txt")]
    #[case("a//b/./c.txt", "a/b/c.txt")]
    #[case("a/b/../c.txt", "a/c.txt")]
    #[case("a\\b\\c.txt", "a/b/c.txt")]
    #[case("../a.txt", "../a.txt")]
    #[case("/../a.txt", "/a.txt")]
    #[case("a/..", ".")]
    #[case("", ".")]
    #[case("./", ".")]
    #[case("uploads/", "uploads")]
    fn test_clean_name(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_name(input), expected);
    }

    #[rstest]
    #[case("/a/b/", "a/b")]
    #[case("a/b", "a/b")]
    #[case("//", "")]
    fn test_safe_join(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(safe_join(input), expected);
    }

    #[rstest]
    #[case("a/b.txt", true)]
    #[case("b.txt", true)]
    #[case("..", false)]
    #[case("../b.txt", false)]
    #[case("/etc/passwd", false)]
    #[case("..b.txt", true)]
    fn test_is_contained(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(is_contained(input), expected);
    }

    #[rstest]
    #[case("report.pdf", ("report", ".pdf"))]
    #[case("archive.tar.gz", ("archive.tar", ".gz"))]
    #[case(".env", (".env", ""))]
    #[case("README", ("README", ""))]
    fn test_split_extension(#[case] leaf: &str, #[case] expected: (&str, &str)) {
        assert_eq!(split_extension(leaf), expected);
    }

    #[test]
    fn test_alternative_name() {
        assert_eq!(
            alternative_name("uploads/report.pdf", "x1y2z3w"),
            "uploads/report_x1y2z3w.pdf"
        );
        assert_eq!(alternative_name("README", "abc"), "README_abc");
    }

    #[test]
    fn test_posix_join() {
        assert_eq!(posix_join("uploads", "a.txt"), "uploads/a.txt");
        assert_eq!(posix_join("uploads/", "a.txt"), "uploads/a.txt");
        assert_eq!(posix_join("", "a.txt"), "a.txt");
        assert_eq!(posix_join("uploads", "/abs/a.txt"), "/abs/a.txt");
    }
}
