//! # Eventide Core
//!
//! Runtime-independent vocabulary shared by every eventide crate:
//!
//! - **Keys** - property keys, including the well-known symbols a host
//!   consults for coercion and tagging
//! - **Operation kinds** - the eventual operations a handler may intercept
//! - **Errors** - setup errors raised synchronously, and the structured
//!   [`TaggedError`] carried inside rejections
//! - **Failure tagging** - build an error from a message template plus
//!   detail values, then hand it to a caller-chosen commit strategy
//!
//! ## Quick Start
//!
//! ```rust
//! use eventide_core::prelude::*;
//!
//! let tools = FailureTools::new(None);
//! let throw_with = tools.throw_with();
//!
//! let err = throw_with.fail_as(ErrorKind::TypeError, "bad {}", &[&42]);
//! assert_eq!(err.to_string(), "TypeError: bad 42");
//! ```

pub mod error;
pub mod failure;
pub mod key;
pub mod types;
pub mod prelude;
