//! Redirect Handling
//!
//! By default a client follows up to 30 redirects. Use
//! [`Policy::limited`] to adjust the maximum chain length or
//! [`Policy::none`] to disable following entirely.

use http::StatusCode;
use url::Url;

use crate::error::{Error, TooManyRedirects};

/// A type that controls the policy on how to handle the following of
/// redirects.
#[derive(Debug, Clone)]
pub struct Policy {
    inner: PolicyKind,
}

#[derive(Debug, Clone)]
enum PolicyKind {
    Limit(usize),
    None,
}

/// Information about the pending redirect hop.
#[derive(Debug)]
pub(crate) struct Attempt<'a> {
    pub(crate) status: StatusCode,
    pub(crate) next: &'a Url,
    pub(crate) previous: &'a [Url],
}

/// What to do with a redirect response.
#[derive(Debug)]
pub(crate) enum Action {
    Follow,
    Stop,
    Error(Error),
}

impl Policy {
    /// Create a `Policy` with a maximum number of redirects.
    ///
    /// An error is returned when the chain exceeds `max`.
    pub fn limited(max: usize) -> Self {
        Self {
            inner: PolicyKind::Limit(max),
        }
    }

    /// Create a `Policy` that does not follow any redirect.
    pub fn none() -> Self {
        Self {
            inner: PolicyKind::None,
        }
    }

    pub(crate) fn check(&self, attempt: Attempt<'_>) -> Action {
        match self.inner {
            PolicyKind::None => Action::Stop,
            PolicyKind::Limit(max) => {
                if attempt.previous.len() > max {
                    Action::Error(Error::redirect(
                        TooManyRedirects,
                        attempt.next.clone(),
                    ))
                } else {
                    log::debug!(
                        "redirecting ({}) to {}",
                        attempt.status,
                        attempt.next
                    );
                    Action::Follow
                }
            }
        }
    }
}

impl Default for Policy {
    fn default() -> Policy {
        Policy::limited(30)
    }
}

/// Whether this status triggers redirect handling at all.
pub(crate) fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// 301/302/303 downgrade non-GET/HEAD methods to GET and drop the body;
/// 307/308 preserve both.
pub(crate) fn downgrades_to_get(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::SEE_OTHER
    )
}
