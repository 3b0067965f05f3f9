//! Match criteria for dynamic options.
//!
//! # Responsibilities
//! - Match the tenant scope of an option entry
//! - Match the filter references of an option entry
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Tenant scope `""` and `*any` match every tenant
//! - Filters are matched against the caller's already-evaluated active set
//! - Empty condition = always matches (wildcard)

use crate::dynopts::context::OptContext;

/// Tenant scope that matches every tenant.
pub const ANY_TENANT: &str = "*any";

/// Trait for matching option entries against a runtime context.
pub trait OptMatcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the context satisfies this condition.
    fn matches(&self, ctx: &OptContext) -> bool;
}

/// Matches the tenant scope.
#[derive(Debug, Clone, Copy)]
pub struct TenantMatcher<'a> {
    scope: &'a str,
}

impl<'a> TenantMatcher<'a> {
    pub fn new(scope: &'a str) -> Self {
        Self { scope }
    }
}

impl OptMatcher for TenantMatcher<'_> {
    fn matches(&self, ctx: &OptContext) -> bool {
        self.scope.is_empty() || self.scope == ANY_TENANT || self.scope == ctx.tenant()
    }
}

/// Matches when every referenced filter is active in the context.
#[derive(Debug, Clone, Copy)]
pub struct FilterSetMatcher<'a> {
    filter_ids: &'a [String],
}

impl<'a> FilterSetMatcher<'a> {
    pub fn new(filter_ids: &'a [String]) -> Self {
        Self { filter_ids }
    }
}

impl OptMatcher for FilterSetMatcher<'_> {
    fn matches(&self, ctx: &OptContext) -> bool {
        self.filter_ids.iter().all(|id| ctx.is_filter_active(id))
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher<'a> {
    matchers: Vec<Box<dyn OptMatcher + 'a>>,
}

impl<'a> AndMatcher<'a> {
    pub fn new(matchers: Vec<Box<dyn OptMatcher + 'a>>) -> Self {
        Self { matchers }
    }
}

impl OptMatcher for AndMatcher<'_> {
    fn matches(&self, ctx: &OptContext) -> bool {
        self.matchers.iter().all(|m| m.matches(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_matcher() {
        let ctx = OptContext::new("acme.org");

        assert!(TenantMatcher::new("").matches(&ctx));
        assert!(TenantMatcher::new("*any").matches(&ctx));
        assert!(TenantMatcher::new("acme.org").matches(&ctx));
        assert!(!TenantMatcher::new("other.org").matches(&ctx));
    }

    #[test]
    fn test_filter_set_matcher() {
        let ctx = OptContext::new("acme.org").with_filters(["FLTR_A", "FLTR_B"]);

        let both = vec!["FLTR_A".to_string(), "FLTR_B".to_string()];
        assert!(FilterSetMatcher::new(&both).matches(&ctx));

        let missing = vec!["FLTR_A".to_string(), "FLTR_C".to_string()];
        assert!(!FilterSetMatcher::new(&missing).matches(&ctx));

        assert!(FilterSetMatcher::new(&[]).matches(&ctx));
    }

    #[test]
    fn test_and_matcher() {
        let ctx = OptContext::new("acme.org").with_filters(["FLTR_A"]);
        let ids = vec!["FLTR_A".to_string()];

        let pass = AndMatcher::new(vec![
            Box::new(TenantMatcher::new("acme.org")),
            Box::new(FilterSetMatcher::new(&ids)),
        ]);
        assert!(pass.matches(&ctx));

        let fail = AndMatcher::new(vec![
            Box::new(TenantMatcher::new("other.org")),
            Box::new(FilterSetMatcher::new(&ids)),
        ]);
        assert!(!fail.matches(&ctx));

        assert!(AndMatcher::default().matches(&ctx));
    }
}
