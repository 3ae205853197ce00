//! Accessors and transformations over the generic error abstraction.
//!
//! Code that only sees `dyn std::error::Error` can still branch on
//! categories and attach context. An error is native when it downcasts to
//! [`Error`], whatever package raised it and whatever its category type.
//! Every other present error is foreign.
//!
//! Every function here is total: absent, foreign, and native inputs all
//! have a defined result, and nothing panics.

use crate::{Categorized, Category, Details, Error, Tag};
use std::borrow::Cow;

/// An owned, thread-safe, type-erased error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type DynError = dyn std::error::Error + 'static;

/// Returns the errcat error behind `err`, if it is one
pub fn native(err: &DynError) -> Option<&Error> {
    err.downcast_ref::<Error>()
}

// =============================================================================
// Accessors
// =============================================================================

/// Returns the category of an error as a value of type `C`.
///
/// - `None` if there is no error, or if the error is native but has no
///   category
/// - `Some(Categorized::Known(c))` if the error is native and its category
///   is a `C`
/// - `Some(Categorized::Unknown)` if the error is foreign, or native with a
///   category of another type
///
/// ```rust
/// use errcat::{category, Categorized, Error, Tag};
///
/// let err: Box<dyn std::error::Error + Send + Sync> =
///     Box::new(Error::new(Tag::from("not_found"), "no such user"));
///
/// match category::<Tag>(Some(&*err)) {
///     None => unreachable!("there is an error"),
///     Some(Categorized::Known(tag)) => assert_eq!(tag.as_str(), "not_found"),
///     Some(Categorized::Unknown) => unreachable!("the error is native"),
/// }
/// ```
pub fn category<C: Category>(err: Option<&DynError>) -> Option<Categorized<C>> {
    let Some(e) = native(err?) else {
        return Some(Categorized::Unknown);
    };
    let category = e.any_category()?;
    Some(match category.get::<C>() {
        Some(c) => Categorized::Known(c),
        None => Categorized::Unknown,
    })
}

/// Returns the serialized category of an error.
///
/// Native errors report their own category string, whatever its type.
/// Foreign errors report the `unknown-category` sentinel.
pub fn category_str<'a>(err: Option<&'a DynError>) -> Option<&'a str> {
    match native(err?) {
        Some(e) => e.category_str(),
        None => Some(Categorized::<Tag>::UNKNOWN),
    }
}

/// Returns the details of a native error, or `None` for absent and foreign
/// errors
pub fn details<'a>(err: Option<&'a DynError>) -> Option<&'a Details> {
    native(err?)?.details()
}

/// Returns the message of an error.
///
/// Native errors lend their stored message; foreign errors are rendered
/// with `Display`.
pub fn message<'a>(err: Option<&'a DynError>) -> Option<Cow<'a, str>> {
    let err = err?;
    Some(match native(err) {
        Some(e) => Cow::Borrowed(e.message()),
        None => Cow::Owned(err.to_string()),
    })
}

// =============================================================================
// Transformations
// =============================================================================

/// Return a new error with the given category and the message and details
/// of `err`.
///
/// No error in, no error out. A foreign error is wrapped: its `Display`
/// output becomes the message and it has no details.
///
/// ```rust
/// use errcat::{BoxError, Error, Tag};
///
/// // Raised by a lower layer with its own category
/// let lower: BoxError = Box::new(Error::detailed(Tag::from("disk_full"), "no space", [("dev", "sda1")]));
///
/// let err = errcat::recategorize(Tag::from("unavailable"), Some(&*lower)).unwrap();
/// assert_eq!(err.category_str(), Some("unavailable"));
/// assert_eq!(err.detail("dev"), Some("sda1"));
/// ```
pub fn recategorize<C: Category>(category: C, err: Option<&DynError>) -> Option<Error> {
    let err = err?;
    Some(match native(err) {
        Some(e) => e.recategorize(category),
        None => {
            tracing::trace!(error = %err, "wrapping foreign error under a category");
            Error::wrap(category, err)
        }
    })
}

/// Return a new error with a detail added.
///
/// Absent and foreign errors pass through unchanged, so the detail is
/// dropped for foreign errors. Normalize errors with [`recategorize`] first
/// if the detail must survive.
pub fn append_detail(
    err: Option<BoxError>,
    key: impl Into<String>,
    value: impl Into<String>,
) -> Option<BoxError> {
    let err = err?;
    match native(&*err) {
        Some(e) => Some(e.append_detail(key, value).into()),
        None => {
            tracing::trace!(error = %err, "foreign error passed through without detail");
            Some(err)
        }
    }
}

/// Return a new error whose message is prefixed with a rendered template.
///
/// See [`Error::prefix_annotate`]. Absent and foreign errors pass through
/// unchanged.
pub fn prefix_annotate<K, V>(
    err: Option<BoxError>,
    template: &str,
    pairs: impl IntoIterator<Item = (K, V)>,
) -> Option<BoxError>
where
    K: Into<String>,
    V: Into<String>,
{
    let err = err?;
    match native(&*err) {
        Some(e) => Some(e.prefix_annotate(template, pairs).into()),
        None => {
            tracing::trace!(error = %err, "foreign error passed through without annotation");
            Some(err)
        }
    }
}
