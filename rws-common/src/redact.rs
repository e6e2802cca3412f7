//! Credential masking for log output.
//!
//! Presented tokens are attacker-controlled and expected tokens are
//! secrets; neither may appear verbatim in a log line. Everything that
//! logs a token goes through [`mask_token`] first.

/// Mask a credential value before logging.
///
/// The value itself is always replaced with `***`; only the distinction
/// between "something was presented" and "nothing was presented" survives,
/// which is what an operator needs to triage a 401.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        "<empty>".to_string()
    } else {
        "***".to_string()
    }
}
