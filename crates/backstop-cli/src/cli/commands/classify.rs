//! `backstop classify` – show how the named predicates treat an error.

use backstop_core::retry::{ai_retry_condition, default_retry_condition, RequestError};

/// Build the error described by the flags. No status and no transport flag means a local error.
pub(crate) fn build_error(
    status: Option<u16>,
    network: bool,
    timeout: bool,
    message: &str,
    retryable: bool,
) -> RequestError {
    let err = match (status, network, timeout) {
        (Some(code), _, _) => RequestError::status(code, message),
        (None, true, _) => RequestError::network(message),
        (None, false, true) => RequestError::timeout(message),
        (None, false, false) => RequestError::local(message),
    };
    if retryable {
        err.retryable()
    } else {
        err
    }
}

pub fn run_classify(status: Option<u16>, network: bool, timeout: bool, message: &str, retryable: bool) {
    let err = build_error(status, network, timeout, message, retryable);
    let verdict = |retry: bool| if retry { "retry" } else { "no retry" };
    println!("error:    {} ({})", err, err.kind());
    println!("standard: {}", verdict(default_retry_condition(&err)));
    println!("ai:       {}", verdict(ai_retry_condition(&err)));
}
