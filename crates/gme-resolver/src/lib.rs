//! GME Resolver
//!
//! Property resolvers that find the entities a property refers to and
//! rewrite the property when a dependency is mapped onto the target cluster.
//!
//! # Built-in Resolvers
//!
//! - [`DefaultResolver`]: Plain header references
//! - [`PolicyResolver`]: Walks assertions and delegates per assertion property
//! - [`ConnectionResolver`]: JDBC and Cassandra connections referenced by name
//! - [`PrivateKeyResolver`]: Keys referenced by keystore and alias
//! - [`ServerVariableResolver`]: Cluster properties inside `${gateway.*}` expressions
//! - [`ValueReferenceResolver`]: Literal values exposed as mappable headers
//! - [`UserGroupResolver`]: Users and groups, always requiring a name mapping
//! - [`ServiceDocumentResolver`]: Documents attached to services
//!
//! # Example
//!
//! ```rust,ignore
//! use gme_resolver::{ResolveContext, ResolverRegistry};
//!
//! let registry = ResolverRegistry::with_defaults();
//! let ctx = ResolveContext::new(&store, &registry);
//! let resolver = registry.resolver_for(entity.owner_kind(), descriptor.resolver)?;
//! let found = resolver.dependencies(&ctx, &header, &entity, descriptor, &path)?;
//! ```

#![warn(unreachable_pub)]

mod connection;
mod document;
mod error;
mod identity;
mod key;
mod policy;
mod reference;
mod registry;
mod resolver;
mod value;
mod variable;

pub use connection::{is_variable_expression, ConnectionResolver};
pub use document::ServiceDocumentResolver;
pub use error::ResolverError;
pub use identity::UserGroupResolver;
pub use key::PrivateKeyResolver;
pub use policy::PolicyResolver;
pub use reference::DefaultResolver;
pub use registry::ResolverRegistry;
pub use resolver::{
    insert_dependency, merge_dependencies, DependencyMap, PropertyResolver, ResolveContext,
    TargetValue,
};
pub use value::ValueReferenceResolver;
pub use variable::{referenced_properties, ServerVariableResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
