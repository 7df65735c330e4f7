//! Command handler registry.
//!
//! Registrations are kept in insertion order. Identifiers need not be unique:
//! dispatch runs *every* registration whose identifier matches, in order, and
//! falls back to the default handler only when nothing matched.
//!
//! The registry is bounded. Once full, a new registration replaces the most
//! recent one instead of being rejected.

/// A command identifier paired with its handler.
#[derive(Debug)]
pub struct Registration<H> {
    command: String,
    handler: H,
}

impl<H> Registration<H> {
    /// The command identifier this handler answers to.
    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Outcome of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// This many registered handlers ran.
    Matched(usize),
    /// No registration matched; the default handler ran.
    Default,
    /// No registration matched and there is no default handler.
    Unhandled,
}

/// Ordered multi-map from command identifiers to handlers.
#[derive(Debug)]
pub struct Registry<H> {
    entries: Vec<Registration<H>>,
    default: Option<H>,
    max: usize,
}

impl<H> Registry<H> {
    /// Create a registry holding at most `max` registrations.
    pub fn new(max: usize) -> Self {
        Registry {
            entries: Vec::new(),
            default: None,
            max: max.max(1),
        }
    }

    /// Attach a handler for `command`.
    pub fn register(&mut self, command: impl Into<String>, handler: H) {
        let entry = Registration {
            command: command.into(),
            handler,
        };

        if self.entries.len() < self.max {
            self.entries.push(entry);
            return;
        }

        let last = self.entries.len() - 1;
        log::warn!(
            "handler table full ({} entries), replacing '{}' with '{}'",
            self.max,
            self.entries[last].command,
            entry.command
        );
        self.entries[last] = entry;
    }

    /// Attach the handler used when no registration matches.
    pub fn register_default(&mut self, handler: H) {
        self.default = Some(handler);
    }

    /// Invoke every handler registered for `command`, or the default handler.
    pub fn dispatch(&mut self, command: &[u8], mut invoke: impl FnMut(&mut H)) -> DispatchResult {
        let mut matched = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.command.as_bytes() == command)
        {
            invoke(&mut entry.handler);
            matched += 1;
        }

        if matched > 0 {
            return DispatchResult::Matched(matched);
        }

        match self.default.as_mut() {
            Some(handler) => {
                invoke(handler);
                DispatchResult::Default
            }
            None => DispatchResult::Unhandled,
        }
    }

    /// Registered command identifiers, in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Registration::command)
    }

    /// Number of registrations (excluding the default handler).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no command handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a default handler is registered.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Maximum number of registrations.
    pub fn capacity(&self) -> usize {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;
    type TestHandler = Box<dyn FnMut(&mut Log)>;

    fn handler(tag: &'static str) -> TestHandler {
        Box::new(move |log: &mut Log| log.push(tag))
    }

    fn run(registry: &mut Registry<TestHandler>, command: &str) -> (DispatchResult, Log) {
        let mut log = Vec::new();
        let result = registry.dispatch(command.as_bytes(), |h| h(&mut log));
        (result, log)
    }

    #[test]
    fn test_dispatch_exact_match() {
        let mut registry = Registry::new(30);
        registry.register("Vivo", handler("vivo"));
        registry.register("Resp", handler("resp"));

        let (result, log) = run(&mut registry, "Resp");
        assert_eq!(result, DispatchResult::Matched(1));
        assert_eq!(log, vec!["resp"]);

        let (result, log) = run(&mut registry, "Res");
        assert_eq!(result, DispatchResult::Unhandled);
        assert!(log.is_empty());
    }

    #[test]
    fn test_duplicate_identifiers_all_run_in_order() {
        let mut registry = Registry::new(30);
        registry.register("Vivo", handler("first"));
        registry.register("Other", handler("other"));
        registry.register("Vivo", handler("second"));

        let (result, log) = run(&mut registry, "Vivo");
        assert_eq!(result, DispatchResult::Matched(2));
        assert_eq!(log, vec!["first", "second"]);
    }

    #[test]
    fn test_default_runs_once_when_unmatched() {
        let mut registry = Registry::new(30);
        registry.register("Vivo", handler("vivo"));
        registry.register_default(handler("default"));

        let (result, log) = run(&mut registry, "Xyz");
        assert_eq!(result, DispatchResult::Default);
        assert_eq!(log, vec!["default"]);

        let (_, log) = run(&mut registry, "Vivo");
        assert_eq!(log, vec!["vivo"]);
    }

    #[test]
    fn test_default_replaced() {
        let mut registry = Registry::new(30);
        registry.register_default(handler("old"));
        registry.register_default(handler("new"));

        let (_, log) = run(&mut registry, "Xyz");
        assert_eq!(log, vec!["new"]);
    }

    #[test]
    fn test_full_table_overwrites_last_slot() {
        let mut registry = Registry::new(2);
        registry.register("A", handler("a"));
        registry.register("B", handler("b"));
        registry.register("C", handler("c"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.commands().collect::<Vec<_>>(), vec!["A", "C"]);
        assert_eq!(run(&mut registry, "B").0, DispatchResult::Unhandled);
        assert_eq!(run(&mut registry, "C").1, vec!["c"]);
    }

    #[test]
    fn test_empty_identifier_matches_only_empty_registration() {
        let mut registry = Registry::new(30);
        registry.register("Vivo", handler("vivo"));
        registry.register_default(handler("default"));

        let (result, _) = run(&mut registry, "");
        assert_eq!(result, DispatchResult::Default);
    }
}
