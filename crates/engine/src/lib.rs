//! Compiles a GraphQL operation against a schema into a reusable execution plan.
//!
//! Compilation validates what only depends on the operation (directive arguments, argument
//! literals, variable usages) and resolves every field site once. Executing the plan only
//! calls resolvers and completes their values:
//!
//! ```ignore
//! let query = CompiledQuery::compile(schema, &document, None, CompilerOptions::default())?;
//! let response = query.query(root, context, &variables).await;
//! ```

mod compiled;
mod execution;
mod operation;
mod options;
mod plan;
mod response;
mod schema;

pub use compiled::{CompileError, CompiledQuery, SubscriptionError};
pub use error::{ErrorCode, ErrorPath, ErrorPathSegment, GraphqlError, Location};
pub use execution::{EventStream, Execution, ExecutionFuture, SubscriptionResponse};
pub use operation::{Fragments, OperationSource};
pub use options::{CompilerOptions, ResolverInfoEnricher};
pub use plan::ResolveInfo;
pub use response::{Response, ResponsePath, ResponseValueId};
pub use schema::{
    ContextValue, FieldError, IsTypeOf, LeafError, LeafSerializer, ParseLiteral, ParseValue, ResolvedValue, Resolver,
    ScalarType, Schema, SchemaBuilder, SchemaError, TypeRef, TypeResolver,
};
