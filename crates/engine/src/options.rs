use std::{collections::HashMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{
    schema::{LeafError, LeafSerializer},
    ResolveInfo,
};

/// Adds user data to the resolve info of every field site, called once per site at compile time.
pub type ResolverInfoEnricher = Arc<dyn Fn(&ResolveInfo<'_>) -> Value + Send + Sync>;

/// Compilation settings. Every flag defaults to `false`.
///
/// The plain flags can be read from configuration:
///
/// ```json
/// { "disableLeafSerialization": true, "customJSONSerializer": true }
/// ```
#[derive(Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerOptions {
    /// Skips capturing a backtrace for the errors raised while executing.
    #[serde(rename = "disablingCapturingStackErrors")]
    pub disable_capturing_stack_errors: bool,
    /// Serializes responses with the serializer derived from the operation shape.
    #[serde(rename = "customJSONSerializer")]
    pub custom_json_serializer: bool,
    /// Enum and built-in scalar values are written as returned by the resolvers.
    pub disable_leaf_serialization: bool,
    /// Leaf serializers replacing the one of the type with the same name.
    #[serde(skip)]
    pub custom_serializers: HashMap<String, LeafSerializer>,
    /// Scopes `@skip`/`@include` conditions by response path instead of by field node.
    pub use_experimental_path_based_skip_include: bool,
    #[serde(skip)]
    pub resolver_info_enricher: Option<ResolverInfoEnricher>,
    /// Keeps a dump of the compiled plan, see [`crate::CompiledQuery::compilation`].
    pub debug: bool,
}

impl CompilerOptions {
    pub fn with_custom_serializer<F>(mut self, type_name: impl Into<String>, serializer: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, LeafError> + Send + Sync + 'static,
    {
        self.custom_serializers.insert(type_name.into(), Arc::new(serializer));
        self
    }

    pub fn with_resolver_info_enricher<F>(mut self, enricher: F) -> Self
    where
        F: Fn(&ResolveInfo<'_>) -> Value + Send + Sync + 'static,
    {
        self.resolver_info_enricher = Some(Arc::new(enricher));
        self
    }

    pub fn with_leaf_serialization_disabled(mut self) -> Self {
        self.disable_leaf_serialization = true;
        self
    }

    pub fn with_custom_json_serializer(mut self) -> Self {
        self.custom_json_serializer = true;
        self
    }

    pub fn with_path_based_skip_include(mut self) -> Self {
        self.use_experimental_path_based_skip_include = true;
        self
    }

    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn without_backtraces(mut self) -> Self {
        self.disable_capturing_stack_errors = true;
        self
    }
}

impl fmt::Debug for CompilerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut custom_serializers = self.custom_serializers.keys().collect::<Vec<_>>();
        custom_serializers.sort_unstable();
        f.debug_struct("CompilerOptions")
            .field("disable_capturing_stack_errors", &self.disable_capturing_stack_errors)
            .field("custom_json_serializer", &self.custom_json_serializer)
            .field("disable_leaf_serialization", &self.disable_leaf_serialization)
            .field("custom_serializers", &custom_serializers)
            .field(
                "use_experimental_path_based_skip_include",
                &self.use_experimental_path_based_skip_include,
            )
            .field("resolver_info_enricher", &self.resolver_info_enricher.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}
