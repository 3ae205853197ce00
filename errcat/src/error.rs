//! The main Error type for errcat

use crate::template;
use crate::{AnyCategory, Category, Tag};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Key-value diagnostic context attached to an error
pub type Details = BTreeMap<String, String>;

/// A categorized error.
///
/// An error carries:
/// - `category`: what callers branch on (may be absent)
/// - `message`: human-readable description, shown to users
/// - `details`: optional key-value pairs for logs and remote systems
///
/// The category is stored type-erased as an [`AnyCategory`]. Every errcat
/// error is this one type whatever its category type, and the typed view is
/// recovered with [`Error::category`].
///
/// Values are never modified after construction. Every transformation
/// (`recategorize`, `append_detail`, `prefix_annotate`) returns a new error
/// with its own copy of the details.
///
/// An empty details map is stored as "no details", matching the wire form
/// where empty details are omitted.
///
/// # Example
///
/// ```rust
/// use errcat::{errorf, Error, Tag};
///
/// const DISK_FULL: Tag = Tag::from_static("disk_full");
///
/// let err: Error = errorf!(DISK_FULL, "wrote {} of {} bytes", 10, 20);
/// let err = err.append_detail("path", "/var/log/app.log");
///
/// assert_eq!(err.category::<Tag>(), Some(DISK_FULL));
/// assert_eq!(err.message(), "wrote 10 of 20 bytes");
/// assert_eq!(err.detail("path"), Some("/var/log/app.log"));
/// ```
#[derive(Clone, PartialEq)]
pub struct Error {
    category: Option<AnyCategory>,
    message: String,
    details: Option<Details>,
}

fn normalize(details: Option<Details>) -> Option<Details> {
    details.filter(|d| !d.is_empty())
}

impl Error {
    /// Create a new error with the given category and message
    pub fn new<C: Category>(category: C, message: impl Into<String>) -> Self {
        Self::from_parts(Some(AnyCategory::new(category)), message, None)
    }

    /// Create a new error with no category
    pub fn uncategorized(message: impl Into<String>) -> Self {
        Self::from_parts(None, message, None)
    }

    /// Create a new error with the given category, message, and details
    pub fn detailed<C, K, V>(
        category: C,
        message: impl Into<String>,
        details: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        C: Category,
        K: Into<String>,
        V: Into<String>,
    {
        let details = details
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_parts(Some(AnyCategory::new(category)), message, Some(details))
    }

    /// Create a new error whose message is formatted from `args`.
    ///
    /// Usually reached through the [`errorf!`](crate::errorf) macro.
    pub fn from_args<C: Category>(category: C, args: fmt::Arguments<'_>) -> Self {
        Self::new(category, args.to_string())
    }

    /// Create an error from each of its parts
    pub fn from_parts(
        category: Option<AnyCategory>,
        message: impl Into<String>,
        details: Option<Details>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            details: normalize(details),
        }
    }

    /// Wrap any other error under a category.
    ///
    /// The message is the other error's `Display` output; no details are
    /// carried over.
    pub fn wrap<C: Category>(category: C, err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(category, err.to_string())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the error category as a value of type `C`.
    ///
    /// Returns `None` when the error has no category, or when its category
    /// belongs to another category type (see [`AnyCategory::get`]).
    pub fn category<C: Category>(&self) -> Option<C> {
        self.category.as_ref()?.get()
    }

    /// Get the error category, whatever its type
    pub fn any_category(&self) -> Option<&AnyCategory> {
        self.category.as_ref()
    }

    /// Get the serialized form of the error category
    pub fn category_str(&self) -> Option<&str> {
        self.category.as_ref().map(AnyCategory::as_str)
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the details, if any were attached
    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    /// Get a single detail value
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.as_ref()?.get(key).map(String::as_str)
    }

    /// Split the error into its category, message, and details
    pub fn into_parts(self) -> (Option<AnyCategory>, String, Option<Details>) {
        (self.category, self.message, self.details)
    }

    // =========================================================================
    // Transformations (each returns a new error)
    // =========================================================================

    /// Return a new error with the same message and details under another
    /// category.
    ///
    /// The new category may be of a different type, which is how a package
    /// translates the errors of the packages it calls into its own
    /// categories.
    pub fn recategorize<C: Category>(&self, category: C) -> Self {
        Self {
            category: Some(AnyCategory::new(category)),
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }

    /// Return a new error with the same category and message, and the
    /// given key-value pair added to a copy of the details.
    pub fn append_detail(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut details = self.details.clone().unwrap_or_default();
        details.insert(key.into(), value.into());
        Self {
            category: self.category.clone(),
            message: self.message.clone(),
            details: Some(details),
        }
    }

    /// Return a new error whose message is prefixed with a rendered template.
    ///
    /// `pairs` are bound as template variables and merged into a copy of the
    /// details; on a key collision the later pair wins. The new message is
    /// `<rendered template>: <old message>`. A template that fails to parse
    /// or execute renders an inline `[[<error>]]` marker instead of failing.
    ///
    /// ```rust
    /// use errcat::{Error, Tag};
    ///
    /// let err = Error::new(Tag::from("auth_fail"), "bad token");
    /// let err = err.prefix_annotate("retry {{.attempt}}", [("attempt", "3")]);
    ///
    /// assert_eq!(err.message(), "retry 3: bad token");
    /// assert_eq!(err.detail("attempt"), Some("3"));
    /// ```
    pub fn prefix_annotate<K, V>(
        &self,
        template: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let bindings: template::Bindings = pairs.iter().cloned().collect();
        let prefix = template::render(template, &bindings);

        let mut details = self.details.clone().unwrap_or_default();
        details.extend(pairs);

        Self::from_parts(
            self.category.clone(),
            format!("{}: {}", prefix, self.message),
            Some(details),
        )
    }
}

/// Create an [`Error`] with a formatted message.
///
/// ```rust
/// use errcat::{errorf, Tag};
///
/// let err = errorf!(Tag::from("disk_full"), "wrote {} of {} bytes", 10, 20);
/// assert_eq!(err.message(), "wrote 10 of 20 bytes");
/// assert!(err.details().is_none());
/// ```
#[macro_export]
macro_rules! errorf {
    ($category:expr, $($arg:tt)+) => {
        $crate::Error::from_args($category, ::std::format_args!($($arg)+))
    };
}

// =============================================================================
// Display - the message, verbatim
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category_str() {
            Some(category) => writeln!(f, "{}", category)?,
            None => writeln!(f, "(no category)")?,
        }

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if let Some(details) = &self.details {
            writeln!(f)?;
            writeln!(f, "    Details:")?;
            for (key, value) in details {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

// =============================================================================
// Serialization
// =============================================================================

#[derive(Serialize)]
struct WireRef<'a> {
    category: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Details>,
}

#[derive(Deserialize)]
struct Wire {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<Details>,
}

impl Serialize for Error {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRef {
            category: self.category_str(),
            message: &self.message,
            details: self.details.as_ref().filter(|d| !d.is_empty()),
        }
        .serialize(serializer)
    }
}

/// The category arrives as a [`Tag`]; [`Error::category`] parses it into
/// whichever category type the reader asks for.
impl<'de> Deserialize<'de> for Error {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Wire::deserialize(deserializer)?;
        let category = wire.category.map(|s| AnyCategory::new(Tag::new(s)));
        Ok(Self::from_parts(category, wire.message, wire.details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::tests::Fixture;

    #[test]
    fn test_errorf() {
        let err = errorf!(Fixture::DiskFull, "wrote {} of {} bytes", 10, 20);
        assert_eq!(err.category::<Fixture>(), Some(Fixture::DiskFull));
        assert_eq!(err.category_str(), Some("disk_full"));
        assert_eq!(err.message(), "wrote 10 of 20 bytes");
        assert!(err.details().is_none());
    }

    #[test]
    fn test_detailed() {
        let err = Error::detailed(Fixture::AuthFail, "bad token", [("user", "alice")]);
        assert_eq!(err.category::<Fixture>(), Some(Fixture::AuthFail));
        assert_eq!(err.message(), "bad token");
        assert_eq!(err.detail("user"), Some("alice"));
        assert_eq!(err.detail("nope"), None);
    }

    #[test]
    fn test_empty_details_are_absent() {
        let err = Error::detailed(Fixture::Internal, "x", Vec::<(String, String)>::new());
        assert!(err.details().is_none());
        assert_eq!(err, Error::new(Fixture::Internal, "x"));
    }

    #[test]
    fn test_uncategorized() {
        let err = Error::uncategorized("something broke");
        assert!(err.any_category().is_none());
        assert_eq!(err.category::<Fixture>(), None);
        assert_eq!(err.to_string(), "something broke");
    }

    #[test]
    fn test_recategorize_keeps_message_and_details() {
        let err = Error::detailed(Fixture::DiskFull, "no space", [("dev", "sda1")]);
        let err2 = err.recategorize(Fixture::Internal);

        assert_eq!(err2.category::<Fixture>(), Some(Fixture::Internal));
        assert_eq!(err2.message(), err.message());
        assert_eq!(err2.details(), err.details());
        assert_eq!(err.category::<Fixture>(), Some(Fixture::DiskFull));
    }

    #[test]
    fn test_recategorize_across_category_types() {
        let err = Error::detailed(Fixture::DiskFull, "no space", [("dev", "sda1")]);
        let err2 = err.recategorize(Tag::from("storage"));
        assert_eq!(err2.category::<Tag>(), Some(Tag::from("storage")));
        assert_eq!(err2.category::<Fixture>(), None);
        assert_eq!(err2.details(), err.details());
    }

    #[test]
    fn test_append_detail_copies() {
        let err = Error::detailed(Fixture::AuthFail, "bad token", [("user", "alice")]);
        let err2 = err.append_detail("attempt", "3");

        let expected: Details = [("user", "alice"), ("attempt", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(err2.details(), Some(&expected));
        assert_eq!(err.details().map(|d| d.len()), Some(1));
        assert_eq!(err.detail("attempt"), None);
        assert_eq!(err2.any_category(), err.any_category());
        assert_eq!(err2.message(), err.message());
    }

    #[test]
    fn test_append_detail_overwrites_key() {
        let err = Error::new(Fixture::Internal, "x")
            .append_detail("k", "1")
            .append_detail("k", "2");
        assert_eq!(err.detail("k"), Some("2"));
    }

    #[test]
    fn test_prefix_annotate() {
        let err = Error::detailed(Fixture::AuthFail, "bad token", [("user", "alice")]);
        let err2 = err.prefix_annotate("retry {{.attempt}}", [("attempt", "3")]);

        assert_eq!(err2.message(), "retry 3: bad token");
        assert_eq!(err2.category::<Fixture>(), Some(Fixture::AuthFail));
        assert_eq!(err2.detail("user"), Some("alice"));
        assert_eq!(err2.detail("attempt"), Some("3"));
        assert_eq!(err.message(), "bad token");
        assert_eq!(err.detail("attempt"), None);
    }

    #[test]
    fn test_prefix_annotate_new_pairs_win() {
        let err = Error::detailed(Fixture::AuthFail, "bad token", [("user", "alice")]);
        let err2 = err.prefix_annotate(
            "as {{quote .user}}",
            [("user", "bob"), ("user", "carol")],
        );
        assert_eq!(err2.message(), "as \"carol\": bad token");
        assert_eq!(err2.detail("user"), Some("carol"));
    }

    #[test]
    fn test_prefix_annotate_undefined_variable() {
        let err = Error::new(Fixture::Internal, "boom");
        let err2 = err.prefix_annotate("step {{.step}}", Vec::<(String, String)>::new());
        assert!(err2.message().contains("[["), "{}", err2.message());
        assert!(err2.message().ends_with("]]: boom"), "{}", err2.message());
        assert!(err2.details().is_none());
    }

    #[test]
    fn test_display_is_message() {
        let err = Error::detailed(Fixture::DiskFull, "disk is full", [("dev", "sda1")]);
        assert_eq!(format!("{}", err), "disk is full");
    }

    #[test]
    fn test_debug() {
        let err = Error::detailed(Fixture::DiskFull, "disk is full", [("dev", "sda1")]);
        let debug = format!("{:?}", err);
        assert!(debug.starts_with("disk_full\n"));
        assert!(debug.contains("Message: disk is full"));
        assert!(debug.contains("dev: sda1"));

        let debug = format!("{:?}", Error::uncategorized(""));
        assert_eq!(debug, "(no category)\n");
    }

    #[test]
    fn test_serialize_shapes() {
        let err = Error::new(Fixture::DiskFull, "full");
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"category":"disk_full","message":"full"}"#
        );

        let err = Error::detailed(Fixture::AuthFail, "bad", [("user", "alice")]);
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"category":"auth_fail","message":"bad","details":{"user":"alice"}}"#
        );

        let err = Error::uncategorized("plain");
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"category":null,"message":"plain"}"#
        );
    }

    #[test]
    fn test_deserialize() {
        let err: Error =
            serde_json::from_str(r#"{"category":"auth_fail","message":"bad","details":{"user":"alice"}}"#)
                .unwrap();
        assert_eq!(err, Error::detailed(Fixture::AuthFail, "bad", [("user", "alice")]));
        assert_eq!(err.category::<Fixture>(), Some(Fixture::AuthFail));

        let err: Error = serde_json::from_str(r#"{"category":null,"message":"m"}"#).unwrap();
        assert_eq!(err, Error::uncategorized("m"));

        let err: Error = serde_json::from_str(r#"{"message":"m"}"#).unwrap();
        assert!(err.any_category().is_none());

        let err: Error =
            serde_json::from_str(r#"{"category":"internal","message":"m","details":{}}"#).unwrap();
        assert!(err.details().is_none());
    }

    #[test]
    fn test_deserialize_unknown_category() {
        let err: Error = serde_json::from_str(r#"{"category":"nope","message":"m"}"#).unwrap();
        assert_eq!(err.category_str(), Some("nope"));
        assert_eq!(err.category::<Fixture>(), None);
        assert_eq!(err.category::<Tag>(), Some(Tag::from("nope")));
    }

    #[test]
    fn test_wrap_foreign() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config.json not found");
        let err = Error::wrap(Fixture::Internal, &io_err);
        assert_eq!(err.message(), "config.json not found");
        assert!(err.details().is_none());
    }

    #[test]
    fn test_into_parts() {
        let (category, message, details) =
            Error::detailed(Fixture::AuthFail, "bad", [("user", "alice")]).into_parts();
        assert_eq!(category.and_then(|c| c.get::<Fixture>()), Some(Fixture::AuthFail));
        assert_eq!(message, "bad");
        assert_eq!(details.map(|d| d.len()), Some(1));
    }
}
