/// Substrings that identify a missing or rejected model API key.
pub const DEFAULT_CREDENTIAL_MARKERS: [&str; 2] =
    ["Gemini API key is not configured", "API key not valid"];

/// Recognizes credential errors by fixed text markers.
///
/// The backend reports a bad key as ordinary response text as well as
/// through faults, so the same predicate runs on both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialClassifier {
    markers: Vec<String>,
}

impl CredentialClassifier {
    /// Builds a classifier from `markers`. Blank markers are dropped.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(Into::<String>::into)
                .filter(|marker| !marker.trim().is_empty())
                .collect(),
        }
    }

    /// True iff `text` contains any marker.
    pub fn is_credential_error(&self, text: &str) -> bool {
        self.markers.iter().any(|marker| text.contains(marker.as_str()))
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for CredentialClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_MARKERS)
    }
}
