//! Registries of debugger services and providers
//!
//! Registries outlive sessions. Entries are compared by pointer identity, so
//! registering the same `Arc` twice keeps one entry, and removing an entry
//! that was never added does nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use dbgctl_core::{same_arc, DebuggerProvider, DebuggerService, EvaluationExpressionProvider};

#[derive(Debug, Clone, Default)]
pub struct Registries {
    /// Services keyed by their name
    pub services: BTreeMap<String, Arc<dyn DebuggerService>>,
    pub debugger_providers: Vec<Arc<dyn DebuggerProvider>>,
    pub evaluation_expression_providers: Vec<Arc<dyn EvaluationExpressionProvider>>,
}

impl Registries {
    /// Register a service. A service with the same name is replaced.
    pub fn add_service(&mut self, service: Arc<dyn DebuggerService>) {
        self.services.insert(service.name().to_string(), service);
    }

    /// Remove `service` if it is the one registered under its name
    pub fn remove_service(&mut self, service: &Arc<dyn DebuggerService>) {
        let registered = self
            .services
            .get(service.name())
            .is_some_and(|existing| same_arc(existing, service));
        if registered {
            self.services.remove(service.name());
        }
    }

    pub fn add_debugger_provider(&mut self, provider: Arc<dyn DebuggerProvider>) {
        insert_unique(&mut self.debugger_providers, provider);
    }

    pub fn remove_debugger_provider(&mut self, provider: &Arc<dyn DebuggerProvider>) {
        remove_identical(&mut self.debugger_providers, provider);
    }

    pub fn add_evaluation_expression_provider(
        &mut self,
        provider: Arc<dyn EvaluationExpressionProvider>,
    ) {
        insert_unique(&mut self.evaluation_expression_providers, provider);
    }

    pub fn remove_evaluation_expression_provider(
        &mut self,
        provider: &Arc<dyn EvaluationExpressionProvider>,
    ) {
        remove_identical(&mut self.evaluation_expression_providers, provider);
    }
}

fn insert_unique<T: ?Sized>(entries: &mut Vec<Arc<T>>, entry: Arc<T>) {
    if !entries.iter().any(|e| same_arc(e, &entry)) {
        entries.push(entry);
    }
}

fn remove_identical<T: ?Sized>(entries: &mut Vec<Arc<T>>, entry: &Arc<T>) {
    entries.retain(|e| !same_arc(e, entry));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named(&'static str);

    impl DebuggerService for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    impl DebuggerProvider for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    impl EvaluationExpressionProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn selector(&self) -> &str {
            "source.js"
        }
    }

    #[test]
    fn test_services_keyed_by_name() {
        let mut registries = Registries::default();
        let node: Arc<dyn DebuggerService> = Arc::new(Named("node"));
        let node_again: Arc<dyn DebuggerService> = Arc::new(Named("node"));

        registries.add_service(node.clone());
        registries.add_service(node_again.clone());
        assert_eq!(registries.services.len(), 1);
        assert!(same_arc(&registries.services["node"], &node_again));

        registries.remove_service(&node_again);
        assert!(registries.services.is_empty());

        registries.remove_service(&node_again);
        assert!(registries.services.is_empty());
    }

    #[test]
    fn test_remove_unregistered_service_with_same_name() {
        let mut registries = Registries::default();
        let registered: Arc<dyn DebuggerService> = Arc::new(Named("node"));
        let stranger: Arc<dyn DebuggerService> = Arc::new(Named("node"));

        registries.add_service(registered.clone());
        registries.remove_service(&stranger);

        assert_eq!(registries.services.len(), 1);
        assert!(same_arc(&registries.services["node"], &registered));
    }

    #[test]
    fn test_provider_set_semantics() {
        let mut registries = Registries::default();
        let a: Arc<dyn DebuggerProvider> = Arc::new(Named("a"));
        let a_twin: Arc<dyn DebuggerProvider> = Arc::new(Named("a"));

        registries.add_debugger_provider(a.clone());
        registries.add_debugger_provider(a.clone());
        registries.add_debugger_provider(a_twin.clone());
        assert_eq!(registries.debugger_providers.len(), 2);

        registries.remove_debugger_provider(&a);
        assert_eq!(registries.debugger_providers.len(), 1);
        assert!(same_arc(&registries.debugger_providers[0], &a_twin));
    }

    #[test]
    fn test_remove_absent_evaluation_provider() {
        let mut registries = Registries::default();
        let p: Arc<dyn EvaluationExpressionProvider> = Arc::new(Named("js"));
        let other: Arc<dyn EvaluationExpressionProvider> = Arc::new(Named("py"));

        registries.add_evaluation_expression_provider(p.clone());
        registries.remove_evaluation_expression_provider(&other);

        assert_eq!(registries.evaluation_expression_providers.len(), 1);
        assert_eq!(registries.evaluation_expression_providers[0].selector(), "source.js");
    }
}
