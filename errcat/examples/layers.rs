//! # Layers Demo
//!
//! Three layers of a small service, each with its own categories. Errors
//! are recategorized and annotated as they travel up, then serialized at
//! the edge. The service layer only sees the storage layer's errors as
//! `BoxError`, and still keeps their details.
//!
//! Run with `RUST_LOG=errcat=trace cargo run --example layers` to see the
//! library's trace events.

use errcat::{errorf, BoxError, Categorize, Categorized, Category, Error};
use tracing_subscriber::EnvFilter;

// =============================================================================
// Storage layer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    NotFound,
    Io,
}

impl Category for Storage {
    fn as_str(&self) -> &str {
        match self {
            Storage::NotFound => "storage_not_found",
            Storage::Io => "storage_io",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "storage_not_found" => Some(Storage::NotFound),
            "storage_io" => Some(Storage::Io),
            _ => None,
        }
    }
}

fn read_row(id: u32) -> Result<String, BoxError> {
    match id {
        1 => Ok("alice".to_string()),
        2 => Ok(std::fs::read_to_string("/nonexistent/rows/2").categorize(Storage::Io)?),
        _ => Err(errorf!(Storage::NotFound, "no row with id {}", id)
            .append_detail("table", "users")
            .into()),
    }
}

// =============================================================================
// Service layer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Service {
    NoSuchUser,
    Unavailable,
}

impl Category for Service {
    fn as_str(&self) -> &str {
        match self {
            Service::NoSuchUser => "no_such_user",
            Service::Unavailable => "unavailable",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "no_such_user" => Some(Service::NoSuchUser),
            "unavailable" => Some(Service::Unavailable),
            _ => None,
        }
    }
}

fn lookup_user(id: u32) -> errcat::Result<String> {
    read_row(id).map_err(|err| {
        let service = match errcat::category::<Storage>(Some(&*err)) {
            Some(Categorized::Known(Storage::NotFound)) => Service::NoSuchUser,
            _ => Service::Unavailable,
        };
        let err = match errcat::native(&*err) {
            Some(native) => native.recategorize(service),
            None => Error::wrap(service, &*err),
        };
        err.prefix_annotate("loading user {{quote .user_id}}", [("user_id", id.to_string())])
    })
}

// =============================================================================
// Edge: only sees boxed errors
// =============================================================================

fn handle(id: u32) -> Result<String, BoxError> {
    let name = lookup_user(id)?;
    Ok(format!("hello, {}", name))
}

fn status_code(err: &BoxError) -> u16 {
    match errcat::category::<Service>(Some(&**err)) {
        None => 200,
        Some(Categorized::Known(Service::NoSuchUser)) => 404,
        Some(Categorized::Known(Service::Unavailable)) => 503,
        Some(Categorized::Unknown) => 500,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== errcat Layers Demo ===\n");

    for id in [1, 2, 3] {
        match handle(id) {
            Ok(body) => println!("[200] {}", body),
            Err(err) => {
                let code = status_code(&err);
                println!("[{}] {}", code, err);
                if let Some(native) = errcat::native(&*err) {
                    match serde_json::to_string(native) {
                        Ok(json) => println!("      {}", json),
                        Err(e) => eprintln!("      failed to serialize error: {}", e),
                    }
                }
            }
        }
    }

    // Details are best-effort on foreign errors: they pass through unchanged
    let foreign: BoxError = "plain string error".into();
    let foreign = errcat::append_detail(Some(foreign), "dropped", "yes");
    if let Some(err) = foreign {
        println!("\n[{}] {}", status_code(&err), err);
    }
}
