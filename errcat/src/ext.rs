//! Extension traits for transforming errors inside a `Result`

use crate::{Category, Error};

/// Transformations on the error arm of a `Result<T, Error>`.
///
/// `Ok` values are "no error" and pass through untouched.
///
/// ```rust
/// use errcat::{Error, ResultExt, Tag};
///
/// fn load() -> Result<u32, Error> {
///     Err(Error::new(Tag::from("not_found"), "no such row"))
/// }
///
/// let err = load()
///     .append_detail("table", "users")
///     .recategorize(Tag::from("bad_request"))
///     .unwrap_err();
///
/// assert_eq!(err.category_str(), Some("bad_request"));
/// assert_eq!(err.detail("table"), Some("users"));
/// ```
pub trait ResultExt<T> {
    /// See [`Error::recategorize`]
    fn recategorize<C: Category>(self, category: C) -> Result<T, Error>;

    /// See [`Error::append_detail`]
    fn append_detail(self, key: impl Into<String>, value: impl Into<String>) -> Result<T, Error>;

    /// See [`Error::prefix_annotate`]
    fn prefix_annotate<K, V>(
        self,
        template: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<T, Error>
    where
        K: Into<String>,
        V: Into<String>;
}

impl<T> ResultExt<T> for Result<T, Error> {
    fn recategorize<C: Category>(self, category: C) -> Result<T, Error> {
        self.map_err(|e| e.recategorize(category))
    }

    fn append_detail(self, key: impl Into<String>, value: impl Into<String>) -> Result<T, Error> {
        self.map_err(|e| e.append_detail(key, value))
    }

    fn prefix_annotate<K, V>(
        self,
        template: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<T, Error>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.map_err(|e| e.prefix_annotate(template, pairs))
    }
}

/// Bring any `Result` into errcat form under a category.
///
/// Errcat errors keep their message and details, whatever their category
/// type; any other error is wrapped with its `Display` output as the message.
///
/// ```rust
/// use errcat::{Categorize, Tag};
///
/// let result: Result<(), std::io::Error> =
///     Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing config"));
/// let err = result.categorize(Tag::from("config")).unwrap_err();
///
/// assert_eq!(err.message(), "missing config");
/// ```
pub trait Categorize<T> {
    /// Put the error, if any, under `category`
    fn categorize<C: Category>(self, category: C) -> Result<T, Error>;
}

impl<T, E> Categorize<T> for Result<T, E>
where
    E: std::error::Error + 'static,
{
    fn categorize<C: Category>(self, category: C) -> Result<T, Error> {
        self.map_err(|e| match crate::native(&e) {
            Some(native) => native.recategorize(category),
            None => Error::wrap(category, &e),
        })
    }
}
