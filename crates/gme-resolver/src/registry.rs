//! Resolver registry
//!
//! Provides [`ResolverRegistry`] for looking up the resolver behind a
//! descriptor. Some entity kinds override the resolver their descriptors
//! declare, e.g. service documents always resolve through the document
//! resolver so that the service side and the document side agree on edges.

use std::collections::HashMap;

use gme_model::{EntityKind, ResolverKind};

use crate::connection::ConnectionResolver;
use crate::document::ServiceDocumentResolver;
use crate::error::ResolverError;
use crate::identity::UserGroupResolver;
use crate::key::PrivateKeyResolver;
use crate::policy::PolicyResolver;
use crate::reference::DefaultResolver;
use crate::resolver::PropertyResolver;
use crate::value::ValueReferenceResolver;
use crate::variable::ServerVariableResolver;

/// Registry of property resolvers, built once at startup
#[derive(Debug, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<ResolverKind, Box<dyn PropertyResolver>>,
    overrides: HashMap<EntityKind, ResolverKind>,
}

impl ResolverRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry with the built-in resolvers
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DefaultResolver);
        registry.register(PolicyResolver);
        registry.register(ConnectionResolver::jdbc());
        registry.register(ConnectionResolver::cassandra());
        registry.register(PrivateKeyResolver);
        registry.register(ServerVariableResolver);
        registry.register(ValueReferenceResolver);
        registry.register(UserGroupResolver);
        registry.register(ServiceDocumentResolver);
        registry.register_override(EntityKind::ServiceDocument, ResolverKind::ServiceDocument);
        registry
    }

    /// Register a resolver, returning the one it replaces
    pub fn register(
        &mut self,
        resolver: impl PropertyResolver + 'static,
    ) -> Option<Box<dyn PropertyResolver>> {
        self.resolvers.insert(resolver.kind(), Box::new(resolver))
    }

    /// Route every descriptor of an entity kind to one resolver
    pub fn register_override(&mut self, owner: EntityKind, resolver: ResolverKind) {
        self.overrides.insert(owner, resolver);
    }

    /// Check if a resolver is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: ResolverKind) -> bool {
        self.resolvers.contains_key(&kind)
    }

    /// Get number of registered resolvers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolver kind used for a descriptor of an owner
    #[must_use]
    pub fn effective_kind(&self, owner: Option<EntityKind>, declared: ResolverKind) -> ResolverKind {
        if declared != ResolverKind::Default {
            return declared;
        }
        owner
            .and_then(|kind| self.overrides.get(&kind).copied())
            .unwrap_or(declared)
    }

    /// Resolver of a kind
    ///
    /// # Errors
    /// Returns [`ResolverError::NotRegistered`] for unknown kinds.
    pub fn get(&self, kind: ResolverKind) -> Result<&dyn PropertyResolver, ResolverError> {
        self.resolvers
            .get(&kind)
            .map(|resolver| &**resolver)
            .ok_or(ResolverError::NotRegistered(kind))
    }

    /// Resolver for a descriptor of an owner, honouring kind overrides
    ///
    /// # Errors
    /// Returns [`ResolverError::NotRegistered`] for unknown kinds.
    pub fn resolver_for(
        &self,
        owner: Option<EntityKind>,
        declared: ResolverKind,
    ) -> Result<&dyn PropertyResolver, ResolverError> {
        self.get(self.effective_kind(owner, declared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_new_empty() {
        let registry = ResolverRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.get(ResolverKind::Default),
            Err(ResolverError::NotRegistered(ResolverKind::Default))
        ));
    }

    #[test]
    fn registry_defaults_cover_every_kind() {
        let registry = ResolverRegistry::with_defaults();
        assert_eq!(registry.len(), ResolverKind::ALL.len());
        for kind in ResolverKind::ALL {
            assert!(registry.contains(kind));
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn service_documents_are_overridden() {
        let registry = ResolverRegistry::with_defaults();
        assert_eq!(
            registry.effective_kind(Some(EntityKind::ServiceDocument), ResolverKind::Default),
            ResolverKind::ServiceDocument
        );
        assert_eq!(
            registry.effective_kind(Some(EntityKind::Policy), ResolverKind::Default),
            ResolverKind::Default
        );
        assert_eq!(
            registry.effective_kind(None, ResolverKind::UserGroup),
            ResolverKind::UserGroup
        );
    }

    #[test]
    fn declared_resolver_wins_over_owner_override() {
        let registry = ResolverRegistry::with_defaults();
        assert_eq!(
            registry.effective_kind(Some(EntityKind::ServiceDocument), ResolverKind::UserGroup),
            ResolverKind::UserGroup
        );
        assert_eq!(
            registry.effective_kind(Some(EntityKind::ServiceDocument), ResolverKind::Policy),
            ResolverKind::Policy
        );
    }
}
