use callable_security::CallContext;

use super::guard::GuardError;

/// Authenticated caller id carried by `ctx`.
///
/// # Errors
/// Returns [`GuardError::Unauthenticated`] when the call carries no identity.
pub fn resolve_identity(ctx: &CallContext) -> Result<&str, GuardError> {
    ctx.uid()
        .filter(|uid| !uid.is_empty())
        .ok_or(GuardError::Unauthenticated)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_is_unauthenticated() {
        assert_eq!(
            resolve_identity(&CallContext::anonymous()),
            Err(GuardError::Unauthenticated)
        );
    }

    #[test]
    fn authenticated_context_yields_uid() {
        let ctx = CallContext::for_uid("u-1");
        assert_eq!(resolve_identity(&ctx), Ok("u-1"));
    }
}
