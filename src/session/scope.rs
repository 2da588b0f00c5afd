use std::collections::HashSet;

use crate::config::EntityConfig;

/// Registry of which entity tables participate in tenant isolation.
///
/// Declared up front rather than inferred at runtime: a table is tenant-owned
/// unless it is explicitly listed as shared, so an unregistered table fails
/// closed into the scoped path.
#[derive(Debug, Clone, Default)]
pub struct EntityScopes {
    shared: HashSet<String>,
}

impl EntityScopes {
    pub fn new(shared: impl IntoIterator<Item = String>) -> Self {
        Self { shared: shared.into_iter().collect() }
    }

    pub fn from_config(config: &EntityConfig) -> Self {
        Self::new(config.shared.iter().cloned())
    }

    /// Declare a table exempt from tenant scoping
    pub fn mark_shared(&mut self, table: impl Into<String>) -> &mut Self {
        self.shared.insert(table.into());
        self
    }

    pub fn is_tenant_owned(&self, table: &str) -> bool {
        !self.shared.contains(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_tables_default_to_tenant_owned() {
        let scopes = EntityScopes::default();
        assert!(scopes.is_tenant_owned("products"));
        assert!(scopes.is_tenant_owned("anything_else"));
    }

    #[test]
    fn shared_tables_are_exempt() {
        let mut scopes = EntityScopes::default();
        scopes.mark_shared("currencies");
        assert!(!scopes.is_tenant_owned("currencies"));
        assert!(scopes.is_tenant_owned("products"));
    }
}
