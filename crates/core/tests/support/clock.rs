use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use timewise_core::agent::ports::Clock;
use timewise_core::{DateExpressionParser, TimeResolver};

/// Clock pinned to a single instant so every turn is deterministic.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parser that answers from a fixed expression table.
///
/// Keys are matched case-insensitively after trimming. Unregistered
/// expressions parse to nothing, which exercises the resolver's `None` path.
#[derive(Default)]
pub struct MappedParser {
    entries: HashMap<String, DateTime<Utc>>,
}

impl MappedParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, expression: &str, parsed: DateTime<Utc>) -> Self {
        self.entries.insert(expression.trim().to_lowercase(), parsed);
        self
    }
}

impl DateExpressionParser for MappedParser {
    fn parse(&self, text: &str, _reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries.get(&text.trim().to_lowercase()).copied()
    }
}

/// Resolver backed by a [`MappedParser`].
pub fn resolver_with(parser: MappedParser) -> TimeResolver {
    TimeResolver::new(Arc::new(parser))
}
