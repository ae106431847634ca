//! JobFeed Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the JobFeed workspace.
//!
//! - **Types**: the persisted [`JobPosting`] and its insert form [`NewJobPosting`]
//! - **Error Handling**: [`JobfeedError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```
//! use jobfeed_common::{NewJobPosting, REMOTE_JOB_TYPE};
//!
//! let posting = NewJobPosting::remote(
//!     "Backend Engineer",
//!     "Acme Corp",
//!     "https://example.com/jobs/42",
//!     "RemoteOK",
//! );
//! assert_eq!(posting.job_type, REMOTE_JOB_TYPE);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{JobfeedError, Result};
pub use types::{JobPosting, NewJobPosting, REMOTE_JOB_TYPE};
