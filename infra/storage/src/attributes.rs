use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Descriptive attributes of a stored object.
///
/// `modified == None` means the age of the object cannot be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub(crate) metadata: BTreeMap<String, String>,
    pub modified: Option<SystemTime>,
    pub created: Option<SystemTime>,
    pub size: u64,
}

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_content_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_metadata(key, value);
        self
    }

    /// Inserts a metadata pair. Keys are lower-cased; the last write for a key wins.
    pub fn insert_metadata(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.metadata.insert(key.as_ref().to_lowercase(), value.into());
    }

    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(&key.to_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub const fn metadata_map(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Age of the object relative to `now`, if known.
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Option<Duration> {
        self.modified.map(|m| now.duration_since(m).unwrap_or_default())
    }

    /// Copies everything describing the content, leaving timestamps and size to the writer.
    #[must_use]
    pub(crate) fn descriptive(&self) -> Self {
        Self {
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            metadata: self.metadata.clone(),
            ..Self::default()
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::default();
        for (k, v) in iter {
            attrs.insert_metadata(k, v);
        }
        attrs
    }
}

/// Options for `open` and `attributes`. Reserved for backend-specific read hints.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct ReaderOptions {}

/// Options for `create`.
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Attributes stamped on the object when the write commits.
    pub attributes: Attributes,
    /// Preferred upload chunk size for backends that stream in parts.
    pub buffer_size: Option<usize>,
}

impl WriterOptions {
    #[must_use]
    pub const fn with_attributes(attributes: Attributes) -> Self {
        Self { attributes, buffer_size: None }
    }
}

pub const DEFAULT_SIGN_METHOD: &str = "GET";
pub const DEFAULT_SIGN_EXPIRY: Duration = Duration::from_secs(60);

/// Options for `url`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedUrlOptions {
    /// HTTP method the signed URL is valid for. Empty means `GET`.
    pub method: String,
    /// How long the signed URL stays valid. Zero means one minute.
    pub expiry: Duration,
}

impl SignedUrlOptions {
    /// Fills unset fields with their defaults.
    #[must_use]
    pub fn apply_defaults(mut self) -> Self {
        if self.method.is_empty() {
            self.method = DEFAULT_SIGN_METHOD.to_owned();
        }
        if self.expiry.is_zero() {
            self.expiry = DEFAULT_SIGN_EXPIRY;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_keys_are_case_normalized() {
        let attrs = Attributes::new().with_metadata("X-Owner", "alice").with_metadata("x-owner", "bob");
        assert_eq!(attrs.metadata("X-OWNER"), Some("bob"));
        assert_eq!(attrs.metadata_map().len(), 1);
    }

    #[test]
    fn collects_pairs_last_write_wins() {
        let attrs: Attributes = [("Key", "1"), ("KEY", "2")].into_iter().collect();
        assert_eq!(attrs.metadata("key"), Some("2"));
    }

    #[test]
    fn unknown_age() {
        let attrs = Attributes::new();
        assert_eq!(attrs.age(SystemTime::now()), None);
    }

    #[test]
    fn signed_url_defaults() {
        let opts = SignedUrlOptions::default().apply_defaults();
        assert_eq!(opts.method, "GET");
        assert_eq!(opts.expiry, Duration::from_secs(60));

        let opts = SignedUrlOptions { method: "PUT".into(), expiry: Duration::from_secs(5) }
            .apply_defaults();
        assert_eq!(opts.method, "PUT");
        assert_eq!(opts.expiry, Duration::from_secs(5));
    }
}
