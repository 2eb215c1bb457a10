//! Integration hook: lets a caller intercept the export pipeline to skip
//! steps entirely or replace how they're serialized, without forking the
//! grouping/rendering logic. Grounded on `config::filter::ObjectFilter`'s
//! predicate-over-catalog idiom, generalized to a predicate-over-step plus
//! an optional serializer.

use crate::diff::operations::MigrationStep;

type FilterFn = Box<dyn Fn(&MigrationStep) -> bool + Send + Sync>;
type SerializeFn = Box<dyn Fn(&MigrationStep) -> Option<String> + Send + Sync>;

/// `filter` runs first and drops any step it rejects; `serialize` then runs
/// per surviving step and, when it returns `Some`, replaces that step's
/// rendered SQL. Returning `None` from `serialize` falls back to the
/// step's own `SqlRenderer::to_sql`.
#[derive(Default)]
pub struct Integration {
    filter: Option<FilterFn>,
    serialize: Option<SerializeFn>,
}

impl Integration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, f: impl Fn(&MigrationStep) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    pub fn with_serialize(
        mut self,
        f: impl Fn(&MigrationStep) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.serialize = Some(Box::new(f));
        self
    }

    pub fn keep(&self, step: &MigrationStep) -> bool {
        self.filter.as_ref().is_none_or(|f| f(step))
    }

    pub fn serialize(&self, step: &MigrationStep) -> Option<String> {
        self.serialize.as_ref().and_then(|f| f(step))
    }

    pub fn apply_filter(&self, steps: Vec<MigrationStep>) -> Vec<MigrationStep> {
        steps.into_iter().filter(|s| self.keep(s)).collect()
    }
}

/// A single rule of the data-driven DSL variant: `{when: Pattern, options}`.
/// Rules are evaluated in order and the first match wins, mirroring a
/// `match`/`case` chain rather than combining every matching rule's effect.
#[derive(Debug, Clone)]
pub struct IntegrationRule {
    pub when: Pattern,
    pub skip_authorization: bool,
}

/// Minimal object-matching pattern for `IntegrationRule`. `Any` matches
/// everything (typically the trailing default rule); `SchemaPrefix` and
/// `ObjectType` match on the step's `StableId` shape.
#[derive(Debug, Clone)]
pub enum Pattern {
    Any,
    SchemaPrefix(String),
    Grant,
}

impl Pattern {
    fn matches(&self, step: &MigrationStep) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::SchemaPrefix(prefix) => step
                .id()
                .schema()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Pattern::Grant => matches!(step, MigrationStep::Grant(_)),
        }
    }
}

/// Evaluate `rules` in order against `step`, returning the first matching
/// rule's `skip_authorization` flag, or `false` (the safe default: render
/// GRANT/REVOKE normally) if nothing matches.
pub fn resolve_skip_authorization(rules: &[IntegrationRule], step: &MigrationStep) -> bool {
    rules
        .iter()
        .find(|rule| rule.when.matches(step))
        .map(|rule| rule.skip_authorization)
        .unwrap_or(false)
}

/// Builds an `Integration` from a DSL rule list: steps matched by a rule
/// with `skip_authorization` are dropped when the object is a grant, since
/// that's the only option this crate's rule set currently expresses.
pub fn integration_from_rules(rules: Vec<IntegrationRule>) -> Integration {
    Integration::new().with_filter(move |step| {
        if matches!(step, MigrationStep::Grant(_)) {
            !resolve_skip_authorization(&rules, step)
        } else {
            true
        }
    })
}
