//! # errcat
//!
//! Errors that are easy to branch on, and keep their original message as
//! they travel up the stack.
//!
//! ## Design Philosophy
//!
//! An error has two independent halves:
//!
//! - **Category**: a value to switch on. Each package defines its own
//!   [`Category`] enum, and is expected to *recategorize* the errors of the
//!   packages it calls into its own categories. Every errcat error is the
//!   same [`Error`] type whatever its category type, so a layer recognizes
//!   errors from the layers below it even behind `dyn std::error::Error`.
//! - **Message**: the human-readable text. It is shown to users and may be
//!   prefixed with more context on the way out.
//!
//! Optional **details** (string key-value pairs) ride along for logs and
//! remote systems. Handling logic should branch on the category, not on
//! details.
//!
//! Errors serialize to, and deserialize from, a small JSON object:
//!
//! ```text
//! {"category":"your_tag","message":"full text goes here"}
//! {"category":"your_tag","message":"full text","details":{"foo":"bar"}}
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use errcat::{errorf, Categorized, Category, ResultExt};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Store {
//!     NotFound,
//! }
//!
//! impl Category for Store {
//!     fn as_str(&self) -> &str {
//!         "store-not-found"
//!     }
//!     fn parse(s: &str) -> Option<Self> {
//!         (s == "store-not-found").then_some(Store::NotFound)
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Api {
//!     BadRequest,
//! }
//!
//! impl Category for Api {
//!     fn as_str(&self) -> &str {
//!         "api-bad-request"
//!     }
//!     fn parse(s: &str) -> Option<Self> {
//!         (s == "api-bad-request").then_some(Api::BadRequest)
//!     }
//! }
//!
//! fn load(id: u32) -> errcat::Result<String> {
//!     Err(errorf!(Store::NotFound, "no row with id {}", id))
//! }
//!
//! fn handle(id: u32) -> errcat::Result<String> {
//!     load(id)
//!         .prefix_annotate("loading user {{.id}}", [("id", id.to_string())])
//!         .recategorize(Api::BadRequest)
//! }
//!
//! let err = handle(7).unwrap_err();
//! assert_eq!(err.category::<Api>(), Some(Api::BadRequest));
//! assert_eq!(err.category::<Store>(), None);
//! assert_eq!(err.message(), "loading user 7: no row with id 7");
//! assert_eq!(err.detail("id"), Some("7"));
//!
//! // Code that only knows about `dyn std::error::Error` can branch too
//! let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
//! match errcat::category::<Api>(Some(&*boxed)) {
//!     None => {}
//!     Some(Categorized::Known(Api::BadRequest)) => {}
//!     Some(Categorized::Unknown) => panic!("bug: unknown error category"),
//! }
//! ```
//!
//! ## Principles
//!
//! - Errors are immutable; every transformation returns a new error
//! - "No error" is the absence of an error, never an empty one
//! - Foreign errors are never a failure: accessors report
//!   [`Categorized::Unknown`], and transformations wrap or pass them through
//! - Panics are for broken invariants only, never for control flow

mod access;
mod category;
mod error;
mod ext;
pub mod template;

pub use access::{
    append_detail, category, category_str, details, message, native, prefix_annotate,
    recategorize, BoxError,
};
pub use category::{AnyCategory, Categorized, Category, Tag};
pub use error::{Details, Error};
pub use ext::{Categorize, ResultExt};
pub use template::TemplateError;

/// Result type alias using errcat Error
pub type Result<T> = std::result::Result<T, Error>;
