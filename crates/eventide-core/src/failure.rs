//! Failure tagging tools.
//!
//! A tagger turns a message template and its detail values into a
//! [`TaggedError`], then hands that error to a *commit* function supplied
//! when the tagger was made. The commit decides what a failure means:
//! [`FailureTools::throw_with`] turns it into a synchronous
//! [`EventideError`], while the runtime builds a rejecting tagger on top of
//! [`FailureTools::make_tagger`] so that per-operation failures never
//! interrupt a pipelined chain.
//!
//! Templates use `{}` as the placeholder for each detail, in order.

use crate::error::{ErrorKind, EventideError, TaggedError};
use std::fmt::Display;
use std::rc::Rc;

/// Backend that combines a template with rendered detail values.
pub trait DetailsFormatter {
    fn format(&self, template: &str, details: &[String]) -> String;
}

/// Substitute each `{}` in `template` with the next detail.
///
/// Placeholders without a detail are kept verbatim; surplus details are
/// appended, separated by spaces.
pub fn interpolate(template: &str, details: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut remaining = details.iter();

    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        match remaining.next() {
            Some(detail) => out.push_str(detail),
            None => out.push_str("{}"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);

    for extra in remaining {
        out.push(' ');
        out.push_str(extra);
    }
    out
}

/// Formatter that quotes every substituted detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotedDetails;

impl DetailsFormatter for QuotedDetails {
    fn format(&self, template: &str, details: &[String]) -> String {
        let quoted: Vec<String> = details.iter().map(|d| format!("{:?}", d)).collect();
        interpolate(template, &quoted)
    }
}

/// Builds tagged errors and taggers.
#[derive(Clone, Default)]
pub struct FailureTools {
    details: Option<Rc<dyn DetailsFormatter>>,
}

impl FailureTools {
    /// Create failure tools, optionally backed by a details formatter.
    ///
    /// Without a formatter, messages are built by literal interpolation.
    pub fn new(details: Option<Rc<dyn DetailsFormatter>>) -> Self {
        Self { details }
    }

    /// Build an error of `kind` from a template and its details.
    pub fn create_error(
        &self,
        kind: ErrorKind,
        template: &str,
        details: &[&dyn Display],
    ) -> TaggedError {
        let rendered: Vec<String> = details.iter().map(|d| d.to_string()).collect();
        let message = match &self.details {
            Some(formatter) => formatter.format(template, &rendered),
            None => interpolate(template, &rendered),
        };
        TaggedError::new(kind, message)
    }

    /// Make a tagger whose failures are committed by `commit`.
    pub fn make_tagger<R>(&self, commit: impl Fn(TaggedError) -> R + 'static) -> Tagger<R> {
        Tagger {
            tools: self.clone(),
            commit: Rc::new(commit),
        }
    }

    /// A tagger whose failures become synchronous setup errors.
    pub fn throw_with(&self) -> Tagger<EventideError> {
        self.make_tagger(EventideError::Tagged)
    }
}

/// Builds an error and commits it.
pub struct Tagger<R> {
    tools: FailureTools,
    commit: Rc<dyn Fn(TaggedError) -> R>,
}

impl<R> Clone for Tagger<R> {
    fn clone(&self) -> Self {
        Self {
            tools: self.tools.clone(),
            commit: Rc::clone(&self.commit),
        }
    }
}

impl<R> Tagger<R> {
    /// Fail with the default error kind.
    pub fn fail(&self, template: &str, details: &[&dyn Display]) -> R {
        self.fail_as(ErrorKind::Error, template, details)
    }

    /// Fail with an explicit error kind.
    pub fn fail_as(&self, kind: ErrorKind, template: &str, details: &[&dyn Display]) -> R {
        let err = self.tools.create_error(kind, template, details);
        (self.commit)(err)
    }
}
