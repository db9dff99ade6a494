use crate::errors::RegistryError;
use std::collections::HashMap;

/// Field order of a checksum manifest line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ManifestLayout {
    /// Decide per line: a first token containing `.` is taken to be the file name.
    #[default]
    Auto,
    /// `digest filename`, as written by `sha256sum`.
    DigestFirst,
    /// `filename digest`, used by the first corpus release.
    FilenameFirst,
}

impl ManifestLayout {
    /// Returns `(digest, filename)` for the two tokens of one line.
    fn order<'a>(self, first: &'a str, second: &'a str) -> (&'a str, &'a str) {
        match self {
            Self::DigestFirst => (first, second),
            Self::FilenameFirst => (second, first),
            // Hex digests never contain '.', file names carry an extension.
            Self::Auto if first.contains('.') => (second, first),
            Self::Auto => (first, second),
        }
    }
}

/// File name to expected hex digest, built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumRegistry {
    entries: HashMap<String, String>,
}

impl ChecksumRegistry {
    /// Parses a manifest, detecting the field order of each line.
    ///
    /// Blank lines are skipped. If a file name appears twice the last entry wins.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MalformedLine`] for a non-empty line that does not
    /// split into exactly two whitespace-separated tokens.
    pub fn parse(manifest: &str) -> Result<Self, RegistryError> {
        Self::parse_with_layout(manifest, ManifestLayout::Auto)
    }

    /// Parses a manifest whose field order is known up front.
    pub fn parse_with_layout(
        manifest: &str,
        layout: ManifestLayout,
    ) -> Result<Self, RegistryError> {
        let mut entries = HashMap::new();

        for line in manifest.lines() {
            let mut tokens = line.split_whitespace();
            let (first, second) = match (tokens.next(), tokens.next(), tokens.next()) {
                (None, _, _) => continue,
                (Some(first), Some(second), None) => (first, second),
                _ => return Err(RegistryError::MalformedLine(line.to_string())),
            };

            let (digest, filename) = layout.order(first, second);
            entries.insert(filename.to_string(), digest.to_string());
        }

        Ok(Self { entries })
    }

    /// Expected digest for a bare file name.
    pub fn lookup(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
