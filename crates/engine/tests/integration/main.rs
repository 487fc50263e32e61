mod abstract_types;
mod arguments;
mod mutation;
mod options;
mod query;
mod subscription;

use std::sync::{Arc, OnceLock};

use engine_jit::{CompileError, CompiledQuery, CompilerOptions, ContextValue, Schema, SchemaBuilder};
use serde_json::Value;
use tokio::runtime::Runtime;

pub fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    })
}

pub fn schema(builder: SchemaBuilder) -> Arc<Schema> {
    Arc::new(builder.build().unwrap())
}

pub fn compile(schema: &Arc<Schema>, query: &str) -> Result<CompiledQuery, CompileError> {
    compile_with(schema, query, CompilerOptions::default())
}

pub fn compile_with(schema: &Arc<Schema>, query: &str, options: CompilerOptions) -> Result<CompiledQuery, CompileError> {
    CompiledQuery::compile_str(schema.clone(), query, None, options)
}

pub fn context() -> ContextValue {
    Arc::new(())
}

/// Executes the query with a `null` root value and returns the serialized response.
pub fn execute(query: &CompiledQuery, variables: Value) -> Value {
    let variables = variables.as_object().cloned().unwrap_or_default();
    runtime()
        .block_on(async { query.query(Value::Null, context(), &variables).await })
        .to_json()
}
