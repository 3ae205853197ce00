//! Error categories for errcat errors

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// A value callers branch on when handling an error.
///
/// errcat does not define any categories itself. Each package that returns
/// errcat errors defines its own closed enum and implements this trait for
/// it. Callers read it back with [`Error::category`](crate::Error::category)
/// or [`crate::category`] naming that enum.
///
/// The string form must be stable: it is what ends up on the wire, and
/// [`Category::parse`] must accept everything [`Category::as_str`] returns.
///
/// # Example
///
/// ```rust
/// use errcat::Category;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum StoreCategory {
///     NotFound,
///     Corrupt,
/// }
///
/// impl Category for StoreCategory {
///     fn as_str(&self) -> &str {
///         match self {
///             StoreCategory::NotFound => "store-not-found",
///             StoreCategory::Corrupt => "store-corrupt",
///         }
///     }
///
///     fn parse(s: &str) -> Option<Self> {
///         match s {
///             "store-not-found" => Some(StoreCategory::NotFound),
///             "store-corrupt" => Some(StoreCategory::Corrupt),
///             _ => None,
///         }
///     }
/// }
///
/// assert_eq!(StoreCategory::parse("store-corrupt"), Some(StoreCategory::Corrupt));
/// ```
pub trait Category: fmt::Debug + Clone + PartialEq + Send + Sync + 'static {
    /// The serialized form of this category
    fn as_str(&self) -> &str;

    /// Parse the serialized form back into a category.
    ///
    /// Returns `None` for strings this category type does not know.
    fn parse(s: &str) -> Option<Self>;
}

/// An open-set category backed by a plain string.
///
/// Useful for callers that don't want to declare an enum, and for tooling
/// that relays errors without knowing the producer's categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    /// Create a tag from a static string, usable in `const` items
    pub const fn from_static(s: &'static str) -> Self {
        Tag(Cow::Borrowed(s))
    }

    /// Create a tag from any string
    pub fn new(s: impl Into<String>) -> Self {
        Tag(Cow::Owned(s.into()))
    }

    /// The tag's text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Category for Tag {
    fn as_str(&self) -> &str {
        Tag::as_str(self)
    }

    fn parse(s: &str) -> Option<Self> {
        Some(Tag::new(s))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Tag {
    fn from(s: &'static str) -> Self {
        Tag::from_static(s)
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Tag::new(s)
    }
}

// =============================================================================
// Type-erased categories
// =============================================================================

/// Object-safe face of [`Category`], so categories of any type can share one
/// error type
trait ErasedCategory: fmt::Debug + Send + Sync {
    fn erased_str(&self) -> &str;
    fn erased_any(&self) -> &dyn Any;
    fn erased_eq(&self, other: &dyn ErasedCategory) -> bool;
}

impl<C: Category> ErasedCategory for C {
    fn erased_str(&self) -> &str {
        Category::as_str(self)
    }

    fn erased_any(&self) -> &dyn Any {
        self
    }

    fn erased_eq(&self, other: &dyn ErasedCategory) -> bool {
        other
            .erased_any()
            .downcast_ref::<C>()
            .is_some_and(|other| self == other)
    }
}

/// A category of any [`Category`] type.
///
/// This is how an [`Error`](crate::Error) stores its category. Errors raised
/// by different packages, each with its own category enum, are all the same
/// Rust type, so code holding a `dyn std::error::Error` can recognize every
/// errcat error without knowing who produced it.
///
/// A [`Tag`] is the untyped form of a category (it is what deserialization
/// produces), so it converts to and compares equal with any category that
/// has the same string form.
///
/// ```rust
/// use errcat::{AnyCategory, Tag};
///
/// let category = AnyCategory::new(Tag::from("disk_full"));
/// assert_eq!(category.as_str(), "disk_full");
/// assert_eq!(category.get::<Tag>(), Some(Tag::from("disk_full")));
/// ```
#[derive(Clone)]
pub struct AnyCategory(Arc<dyn ErasedCategory>);

impl AnyCategory {
    /// Erase the type of a category
    pub fn new<C: Category>(category: C) -> Self {
        AnyCategory(Arc::new(category))
    }

    /// The serialized form of the category
    pub fn as_str(&self) -> &str {
        self.0.erased_str()
    }

    /// Check whether the category was created from a value of type `C`
    pub fn is<C: Category>(&self) -> bool {
        self.0.erased_any().is::<C>()
    }

    /// View the category as a value of type `C`.
    ///
    /// Returns `None` when the category belongs to another category type.
    /// When either side is a [`Tag`], the string form is parsed instead.
    pub fn get<C: Category>(&self) -> Option<C> {
        if let Some(category) = self.0.erased_any().downcast_ref::<C>() {
            return Some(category.clone());
        }
        if self.is::<Tag>() || TypeId::of::<C>() == TypeId::of::<Tag>() {
            return C::parse(self.as_str());
        }
        None
    }
}

impl PartialEq for AnyCategory {
    fn eq(&self, other: &Self) -> bool {
        if self.0.erased_eq(&*other.0) {
            return true;
        }
        (self.is::<Tag>() || other.is::<Tag>()) && self.as_str() == other.as_str()
    }
}

impl fmt::Debug for AnyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for AnyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Accessor results
// =============================================================================

/// The category of a present error, as seen through the generic
/// `std::error::Error` abstraction.
///
/// Returned by [`crate::category`]. An absent error has no category at all,
/// which the accessor expresses as `None` rather than as a variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Categorized<C> {
    /// The error is an errcat error with this category
    Known(C),
    /// The error is present but is not an errcat error, or its category
    /// belongs to another category type
    Unknown,
}

impl<C> Categorized<C> {
    /// Serialized form of the [`Categorized::Unknown`] sentinel
    pub const UNKNOWN: &'static str = "unknown-category";

    /// Returns the known category, if any
    pub fn known(&self) -> Option<&C> {
        match self {
            Categorized::Known(c) => Some(c),
            Categorized::Unknown => None,
        }
    }

    /// Check whether this is the unknown-category sentinel
    pub fn is_unknown(&self) -> bool {
        matches!(self, Categorized::Unknown)
    }
}

impl<C: Category> Categorized<C> {
    /// Returns the category as a string, or the sentinel string
    pub fn as_str(&self) -> &str {
        match self {
            Categorized::Known(c) => c.as_str(),
            Categorized::Unknown => Self::UNKNOWN,
        }
    }
}

impl<C: Category> fmt::Display for Categorized<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A closed category set shared by the unit tests in this crate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Fixture {
        DiskFull,
        AuthFail,
        Internal,
    }

    impl Category for Fixture {
        fn as_str(&self) -> &str {
            match self {
                Fixture::DiskFull => "disk_full",
                Fixture::AuthFail => "auth_fail",
                Fixture::Internal => "internal",
            }
        }

        fn parse(s: &str) -> Option<Self> {
            match s {
                "disk_full" => Some(Fixture::DiskFull),
                "auth_fail" => Some(Fixture::AuthFail),
                "internal" => Some(Fixture::Internal),
                _ => None,
            }
        }
    }

    #[test]
    fn test_fixture_parse_matches_as_str() {
        for c in [Fixture::DiskFull, Fixture::AuthFail, Fixture::Internal] {
            assert_eq!(Fixture::parse(c.as_str()), Some(c));
        }
        assert_eq!(Fixture::parse("nope"), None);
    }

    #[test]
    fn test_tag_accepts_any_string() {
        let tag = Tag::parse("whatever").unwrap();
        assert_eq!(tag.as_str(), "whatever");
        assert_eq!(tag, Tag::from_static("whatever"));
        assert_eq!(tag.to_string(), "whatever");
    }

    #[test]
    fn test_categorized_display() {
        assert_eq!(Categorized::Known(Fixture::DiskFull).to_string(), "disk_full");
        assert_eq!(
            Categorized::<Fixture>::Unknown.to_string(),
            "unknown-category"
        );
        assert!(Categorized::<Fixture>::Unknown.is_unknown());
        assert_eq!(Categorized::Known(Fixture::Internal).known(), Some(&Fixture::Internal));
    }

    #[test]
    fn test_any_category_get() {
        let category = AnyCategory::new(Fixture::DiskFull);
        assert!(category.is::<Fixture>());
        assert_eq!(category.as_str(), "disk_full");
        assert_eq!(category.get::<Fixture>(), Some(Fixture::DiskFull));
        assert_eq!(category.get::<Tag>(), Some(Tag::from("disk_full")));

        let tagged = AnyCategory::new(Tag::from("auth_fail"));
        assert_eq!(tagged.get::<Fixture>(), Some(Fixture::AuthFail));
        assert_eq!(AnyCategory::new(Tag::from("nope")).get::<Fixture>(), None);
    }

    #[test]
    fn test_any_category_other_type() {
        #[derive(Debug, Clone, PartialEq)]
        struct Other;

        impl Category for Other {
            fn as_str(&self) -> &str {
                "disk_full"
            }

            fn parse(s: &str) -> Option<Self> {
                (s == "disk_full").then_some(Other)
            }
        }

        let other = AnyCategory::new(Other);
        assert_eq!(other.get::<Fixture>(), None);
        assert_ne!(other, AnyCategory::new(Fixture::DiskFull));
        assert_eq!(other, AnyCategory::new(Tag::from("disk_full")));
    }

    #[test]
    fn test_any_category_eq() {
        let a = AnyCategory::new(Fixture::DiskFull);
        assert_eq!(a, AnyCategory::new(Fixture::DiskFull));
        assert_ne!(a, AnyCategory::new(Fixture::Internal));
        assert_eq!(a, AnyCategory::new(Tag::from("disk_full")));
        assert_ne!(a, AnyCategory::new(Tag::from("internal")));
        assert_eq!(format!("{:?}", a), "DiskFull");
        assert_eq!(a.to_string(), "disk_full");
    }
}
