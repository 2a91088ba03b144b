//! Ordered candidate resolution.
//!
//! A specifier like `~pkg` or `child` can mean either a package-style
//! request or a plain relative file. The sequencer tries each candidate form
//! in order and stops at the first that resolves.

use std::path::{Path, PathBuf};
use tracing::trace;

use crate::path::url_to_request;
use crate::resolver::{ModuleResolver, ResolveError};

/// Candidate request forms for a specifier: the bundler form first, then the
/// raw text. Duplicates are removed.
pub fn candidate_requests(specifier: &str, root: Option<&str>) -> Vec<String> {
    let mut requests = Vec::with_capacity(2);
    for request in [url_to_request(specifier, root), specifier.to_string()] {
        if !request.is_empty() && !requests.contains(&request) {
            requests.push(request);
        }
    }
    requests
}

/// Try `requests` in order against `resolver`, returning the first success or
/// the last failure.
pub async fn resolve_requests(
    resolver: &dyn ModuleResolver,
    context: &Path,
    specifier: &str,
    requests: &[String],
) -> Result<Vec<PathBuf>, ResolveError> {
    let mut last_error = None;

    for request in requests {
        match resolver.resolve(context, request).await {
            Ok(paths) => return Ok(paths),
            Err(err) => {
                trace!(request = %request, error = %err, "Candidate request failed");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ResolveError::NoCandidates {
        specifier: specifier.to_string(),
    }))
}
