//! Recursive archive admission filter.
//!
//! `payloadguard-core` decides whether an attachment may pass a mail
//! gateway. It walks TAR, ZIP and RAR containers, nested to any depth up
//! to a configurable cap, and rejects the stream as soon as any entry's
//! file extension is disallowed by the caller's policy. Streams that are
//! not archives are admitted.
//!
//! The engine is synchronous, allocates only the buffers needed to recurse
//! into entry bodies, and never surfaces errors: every evaluation ends in
//! one [`Verdict`].
//!
//! # Examples
//!
//! ```
//! use payloadguard_core::ExtensionBlacklist;
//! use payloadguard_core::InspectionLimits;
//! use payloadguard_core::Verdict;
//! use payloadguard_core::evaluate;
//! use payloadguard_core::test_utils::create_test_tar;
//! use std::io::Cursor;
//!
//! let attachment = create_test_tar(vec![("report.pdf", b"%PDF"), ("setup.exe", b"MZ")]);
//! let policy = ExtensionBlacklist::mail_default();
//!
//! let verdict = evaluate(&mut Cursor::new(attachment), &policy, &InspectionLimits::default());
//! assert_eq!(verdict, Verdict::RejectBlacklisted);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod formats;
pub mod inspection;
pub mod io;
pub mod policy;
pub mod report;
pub mod security;
pub mod test_utils;
pub mod verdict;

// Re-export main API types
pub use api::evaluate;
pub use api::inspect;
pub use config::DEFAULT_MAX_DEPTH;
pub use config::DEFAULT_MAX_ENTRY_BYTES;
pub use config::InspectionLimits;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherBuilder;
pub use error::InspectionError;
pub use error::QuotaResource;
pub use error::Result;
pub use inspection::Inspection;
pub use policy::AllowAll;
pub use policy::ExtensionBlacklist;
pub use policy::ExtensionPolicy;
pub use report::InspectionReport;
pub use report::InspectionStats;
pub use verdict::RejectReason;
pub use verdict::Verdict;
