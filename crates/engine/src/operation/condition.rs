//! Inclusion conditions derived from `@skip` and `@include`.
//!
//! Conditions are kept in a side table keyed by field node, and by response path when path based
//! caching is enabled, instead of being attached to the document.

use async_graphql_parser::{
    types::{BaseType, Directive, Field, VariableDefinition},
    Positioned,
};
use async_graphql_value::Value as AstValue;
use fxhash::FxHashMap;
use serde_json::{Map, Value};

use super::{location, validation_error};
use error::GraphqlError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum IfArgument {
    Literal(bool),
    Variable(String),
}

impl IfArgument {
    fn resolve(&self, variables: &Map<String, Value>) -> Option<bool> {
        match self {
            IfArgument::Literal(value) => Some(*value),
            IfArgument::Variable(name) => variables.get(name).and_then(Value::as_bool),
        }
    }
}

/// Condition contributed by the directives of a single node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ConditionTerm {
    Skip(IfArgument),
    Include(IfArgument),
    SkipAndInclude { skip: IfArgument, include: IfArgument },
}

impl ConditionTerm {
    pub fn holds(&self, variables: &Map<String, Value>) -> bool {
        match self {
            ConditionTerm::Skip(skip) => skip.resolve(variables) == Some(false),
            ConditionTerm::Include(include) => include.resolve(variables) == Some(true),
            ConditionTerm::SkipAndInclude { skip, include } => {
                skip.resolve(variables) == Some(false) && include.resolve(variables) == Some(true)
            }
        }
    }
}

/// Whether a field of the response is included, decided once per execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Condition {
    Always,
    /// Included if every term of any of the conjunctions holds.
    AnyOf(Vec<Vec<ConditionTerm>>),
}

impl Condition {
    /// Merges the conditions of every node selecting the same response key.
    ///
    /// Nodes without recorded condition are ignored, a node with an empty one makes the field
    /// unconditional.
    pub fn merge<'a>(conjunctions: impl IntoIterator<Item = Option<&'a [ConditionTerm]>>) -> Self {
        let mut any_of = Vec::new();
        for conjunction in conjunctions.into_iter().flatten() {
            if conjunction.is_empty() {
                return Condition::Always;
            }
            any_of.push(conjunction.to_vec());
        }
        if any_of.is_empty() {
            Condition::Always
        } else {
            Condition::AnyOf(any_of)
        }
    }

    pub fn evaluate(&self, variables: &Map<String, Value>) -> bool {
        match self {
            Condition::Always => true,
            Condition::AnyOf(any_of) => any_of
                .iter()
                .any(|conjunction| conjunction.iter().all(|term| term.holds(variables))),
        }
    }
}

/// Accumulated condition terms of field nodes.
#[derive(Default)]
pub(crate) struct ConditionTable {
    terms: FxHashMap<(usize, Option<String>), Vec<ConditionTerm>>,
}

fn node_key(node: &Positioned<Field>, path: Option<&str>) -> (usize, Option<String>) {
    (node as *const Positioned<Field> as usize, path.map(str::to_string))
}

impl ConditionTable {
    /// Adds terms to the conjunction of the node, ignoring those already present.
    pub fn accumulate<'t>(
        &mut self,
        node: &Positioned<Field>,
        path: Option<&str>,
        terms: impl IntoIterator<Item = &'t ConditionTerm>,
    ) {
        let conjunction = self.terms.entry(node_key(node, path)).or_default();
        for term in terms {
            if !conjunction.contains(term) {
                conjunction.push(term.clone());
            }
        }
    }

    pub fn get(&self, node: &Positioned<Field>, path: Option<&str>) -> Option<&[ConditionTerm]> {
        self.terms.get(&node_key(node, path)).map(Vec::as_slice)
    }
}

/// Term of a node's `@skip`/`@include` directives, `None` when it is unconditional.
pub(crate) fn compile_skip_include(
    directives: &[Positioned<Directive>],
    variable_definitions: &[Positioned<VariableDefinition>],
) -> Result<Option<ConditionTerm>, GraphqlError> {
    let find = |name: &str| directives.iter().find(|directive| directive.node.name.node == name);
    let skip = find("skip")
        .map(|directive| compile_if_argument(directive, variable_definitions))
        .transpose()?;
    let include = find("include")
        .map(|directive| compile_if_argument(directive, variable_definitions))
        .transpose()?;
    Ok(match (skip, include) {
        (Some(skip), Some(include)) => Some(ConditionTerm::SkipAndInclude { skip, include }),
        (Some(skip), None) => Some(ConditionTerm::Skip(skip)),
        (None, Some(include)) => Some(ConditionTerm::Include(include)),
        (None, None) => None,
    })
}

fn compile_if_argument(
    directive: &Positioned<Directive>,
    variable_definitions: &[Positioned<VariableDefinition>],
) -> Result<IfArgument, GraphqlError> {
    let directive_name = &directive.node.name.node;
    let Some((argument_name, value)) = directive.node.arguments.iter().find(|(name, _)| name.node == "if") else {
        return Err(validation_error(format!(
            "Directive '{directive_name}' is missing required arguments: 'if'"
        ))
        .with_location(location(directive.pos)));
    };
    match &value.node {
        AstValue::Boolean(value) => Ok(IfArgument::Literal(*value)),
        AstValue::Variable(variable) => {
            let Some(definition) = variable_definitions
                .iter()
                .find(|definition| definition.node.name.node == *variable)
            else {
                return Err(validation_error(format!("Variable '{variable}' is not defined"))
                    .with_location(location(value.pos)));
            };
            let ty = &definition.node.var_type.node;
            let is_boolean = matches!(&ty.base, BaseType::Named(name) if name == "Boolean");
            let accepted = is_boolean && (!ty.nullable || definition.node.default_value.is_some());
            if !accepted {
                return Err(validation_error(format!(
                    "Variable '{variable}' of type '{ty}' used in position expecting type 'Boolean!'"
                ))
                .with_location(location(definition.pos)));
            }
            Ok(IfArgument::Variable(variable.to_string()))
        }
        other => Err(validation_error(format!(
            "Argument 'if' on Directive '{directive_name}' has an invalid value ({}). Expected type 'Boolean!'",
            untyped(other)
        ))
        .with_location(location(argument_name.pos))),
    }
}

/// Value of a literal as a JavaScript template would interpolate it.
fn untyped(value: &AstValue) -> String {
    match value {
        AstValue::String(value) => value.clone(),
        AstValue::Enum(name) => name.to_string(),
        other => other
            .clone()
            .into_const()
            .and_then(|value| value.into_json().ok())
            .map(|value| crate::response::inspect::display(&value))
            .unwrap_or_else(|| other.to_string()),
    }
}
