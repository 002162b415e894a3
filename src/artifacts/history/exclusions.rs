//! Path exclusion globs
//!
//! Globs follow shell `fnmatch` rules rather than gitignore rules:
//!
//! - `*` matches any run of characters, `/` included
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character of a set, `[!abc]` negates it
//! - an unterminated `[` is a literal bracket
//!
//! A glob is tested against the full slash-separated path. Globs without a `/`
//! are also tested against the final path component, so `*.pem` and `id_rsa`
//! work at any depth.

use anyhow::Context;
use regex::Regex;
use std::path::Path;

/// Name of the per-directory exclusion file
pub const IGNORE_FILE_NAME: &str = ".ludvigignore";

#[derive(Debug, Clone)]
struct Exclusion {
    glob: String,
    regex: Regex,
    basename_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    exclusions: Vec<Exclusion>,
}

impl ExclusionSet {
    pub fn new<I, S>(globs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ExclusionSet::default();
        for glob in globs {
            set.add(glob.as_ref())?;
        }
        Ok(set)
    }

    /// Read `.ludvigignore` from `dir`, one glob per line.
    ///
    /// Blank lines and `#` comments are skipped. A missing file yields an
    /// empty set.
    pub fn load_ignore_file(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(IGNORE_FILE_NAME);
        if !path.is_file() {
            return Ok(ExclusionSet::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Unable to read {}", path.display()))?;
        let set = Self::new(content.lines())
            .with_context(|| format!("Invalid exclusion in {}", path.display()))?;
        tracing::debug!(file = %path.display(), count = set.len(), "loaded exclusions");

        Ok(set)
    }

    /// Compile and add one glob; blank lines and comments are ignored
    pub fn add(&mut self, glob: &str) -> anyhow::Result<()> {
        let glob = glob.trim();
        if glob.is_empty() || glob.starts_with('#') {
            return Ok(());
        }

        let regex = Regex::new(&glob_to_regex(glob))
            .with_context(|| format!("Invalid exclusion glob {glob:?}"))?;
        self.exclusions.push(Exclusion {
            glob: glob.to_string(),
            regex,
            basename_only: !glob.contains('/'),
        });

        Ok(())
    }

    pub fn extend(&mut self, other: ExclusionSet) {
        self.exclusions.extend(other.exclusions);
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        let file_name = path.rsplit('/').next().unwrap_or(path);

        self.exclusions.iter().any(|exclusion| {
            exclusion.regex.is_match(path)
                || (exclusion.basename_only && exclusion.regex.is_match(file_name))
        })
    }

    pub fn globs(&self) -> impl Iterator<Item = &str> {
        self.exclusions.iter().map(|exclusion| exclusion.glob.as_str())
    }

    pub fn len(&self) -> usize {
        self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exclusions.is_empty()
    }
}

/// Translate an fnmatch glob into an anchored regular expression
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut pattern = String::from("(?s)^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    pattern.push('[');
                    let mut body = &chars[i + 1..end];
                    if let Some(('!', rest)) = body.split_first() {
                        pattern.push('^');
                        body = rest;
                    }
                    for &c in body {
                        if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
                            pattern.push('\\');
                        }
                        pattern.push(c);
                    }
                    pattern.push(']');
                    i = end;
                }
                None => pattern.push_str(r"\["),
            },
            c => pattern.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    pattern.push('$');
    pattern
}

/// Index of the `]` closing the class opened at `start`
///
/// A `]` right after `[` or `[!` is a member of the set, not its end.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if chars.get(i) == Some(&'!') {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    (i..chars.len()).find(|&j| chars[j] == ']')
}
