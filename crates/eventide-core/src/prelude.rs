//! Eventide Core Prelude - convenient imports for common usage.
//!
//! ```rust
//! use eventide_core::prelude::*;
//! ```

pub use crate::key::{Key, WellKnownSymbol};

pub use crate::types::{CellId, DeferredId, OpKind};

pub use crate::failure::{interpolate, DetailsFormatter, FailureTools, QuotedDetails, Tagger};

// Re-export error types
pub use crate::error::{ErrorKind, EventideError, Result, TaggedError};
