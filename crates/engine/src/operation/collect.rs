use async_graphql_parser::{
    types::{Field, Selection, SelectionSet, VariableDefinition},
    Positioned,
};
use fxhash::FxHashSet;
use indexmap::IndexMap;

use super::{
    condition::{compile_skip_include, ConditionTable, ConditionTerm},
    Fragments,
};
use crate::Schema;
use error::GraphqlError;

/// Field nodes grouped by response key, in selection order.
pub(crate) type FieldMap<'a> = IndexMap<&'a str, Vec<&'a Positioned<Field>>>;

/// Joins two segments of the response path used to key path based conditions.
pub(crate) fn join_path(parent: &str, key: &str) -> String {
    match (parent.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}.{key}"),
    }
}

struct Frame<'a> {
    selections: std::slice::Iter<'a, Positioned<Selection>>,
    /// Terms of the fragments enclosing these selections.
    conditions: Vec<ConditionTerm>,
}

struct PendingSelection<'a> {
    parent: &'a Positioned<Field>,
    selection: &'a Positioned<Selection>,
    from_fragment: bool,
    parent_path: String,
}

/// Resolves selection sets into field maps for a runtime type and records the inclusion
/// condition of every collected field node.
pub(crate) struct FieldCollector<'a> {
    schema: &'a Schema,
    fragments: &'a Fragments,
    variable_definitions: &'a [Positioned<VariableDefinition>],
    path_based: bool,
    conditions: ConditionTable,
}

impl<'a> FieldCollector<'a> {
    pub fn new(
        schema: &'a Schema,
        fragments: &'a Fragments,
        variable_definitions: &'a [Positioned<VariableDefinition>],
        path_based: bool,
    ) -> Self {
        FieldCollector {
            schema,
            fragments,
            variable_definitions,
            path_based,
            conditions: ConditionTable::default(),
        }
    }

    pub fn conditions(&self) -> &ConditionTable {
        &self.conditions
    }

    pub fn is_path_based(&self) -> bool {
        self.path_based
    }

    pub fn collect_fields(
        &mut self,
        runtime_type: &str,
        selection_set: &'a Positioned<SelectionSet>,
        parent_path: &str,
    ) -> Result<FieldMap<'a>, GraphqlError> {
        let mut fields = FieldMap::default();
        let mut visited = FxHashSet::default();
        self.collect_into(&mut fields, &mut visited, runtime_type, selection_set, parent_path)?;
        Ok(fields)
    }

    /// Collects the sub selections of merged field nodes, fragments already expanded at the
    /// parent level can be expanded again.
    pub fn collect_subfields(
        &mut self,
        return_type: &str,
        field_nodes: &[&'a Positioned<Field>],
        parent_path: &str,
    ) -> Result<FieldMap<'a>, GraphqlError> {
        let mut fields = FieldMap::default();
        let mut visited = FxHashSet::default();
        for node in field_nodes {
            if !node.node.selection_set.node.items.is_empty() {
                self.collect_into(
                    &mut fields,
                    &mut visited,
                    return_type,
                    &node.node.selection_set,
                    parent_path,
                )?;
            }
        }
        Ok(fields)
    }

    fn collect_into(
        &mut self,
        fields: &mut FieldMap<'a>,
        visited: &mut FxHashSet<&'a str>,
        runtime_type: &str,
        selection_set: &'a Positioned<SelectionSet>,
        parent_path: &str,
    ) -> Result<(), GraphqlError> {
        let mut stack = vec![Frame {
            selections: selection_set.node.items.iter(),
            conditions: Vec::new(),
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(selection) = frame.selections.next() else {
                stack.pop();
                continue;
            };
            let (selection_set, directives) = match &selection.node {
                Selection::Field(field) => {
                    self.collect_field(fields, field, parent_path, &frame.conditions)?;
                    continue;
                }
                Selection::InlineFragment(fragment) => {
                    let condition = fragment
                        .node
                        .type_condition
                        .as_ref()
                        .map(|condition| condition.node.on.node.as_str());
                    if !self.does_fragment_condition_match(condition, runtime_type) {
                        continue;
                    }
                    (&fragment.node.selection_set, &fragment.node.directives)
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if !visited.insert(name) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name) else {
                        continue;
                    };
                    let condition = fragment.node.type_condition.node.on.node.as_str();
                    if !self.does_fragment_condition_match(Some(condition), runtime_type) {
                        continue;
                    }
                    (&fragment.node.selection_set, &spread.node.directives)
                }
            };
            let mut conditions = frame.conditions.clone();
            if let Some(term) = compile_skip_include(directives, self.variable_definitions)? {
                if !conditions.contains(&term) {
                    conditions.push(term);
                }
            }
            stack.push(Frame {
                selections: selection_set.node.items.iter(),
                conditions,
            });
        }

        Ok(())
    }

    fn collect_field(
        &mut self,
        fields: &mut FieldMap<'a>,
        field: &'a Positioned<Field>,
        parent_path: &str,
        inherited: &[ConditionTerm],
    ) -> Result<(), GraphqlError> {
        let key = field.node.response_key().node.as_str();
        let current_path = join_path(parent_path, key);
        let own = compile_skip_include(&field.node.directives, self.variable_definitions)?;
        let slot = self.path_based.then_some(current_path.as_str());
        self.conditions.accumulate(field, slot, inherited.iter().chain(own.iter()));
        self.augment_field_tree(field, &current_path);
        fields.entry(key).or_default().push(field);
        Ok(())
    }

    /// Fields selected directly below a field inherit its conditions. Fields reached through a
    /// fragment only carry the conditions recorded when they are collected themselves.
    fn augment_field_tree(&mut self, root: &'a Positioned<Field>, root_path: &str) {
        let mut stack: Vec<PendingSelection<'a>> = root
            .node
            .selection_set
            .node
            .items
            .iter()
            .rev()
            .map(|selection| PendingSelection {
                parent: root,
                selection,
                from_fragment: false,
                parent_path: root_path.to_string(),
            })
            .collect();

        while let Some(PendingSelection {
            parent,
            selection,
            from_fragment,
            parent_path,
        }) = stack.pop()
        {
            let (selection_set, parent) = match &selection.node {
                Selection::Field(field) => {
                    let current_path = join_path(&parent_path, field.node.response_key().node.as_str());
                    if !from_fragment {
                        let parent_slot = self.path_based.then_some(parent_path.as_str());
                        let inherited = self.conditions.get(parent, parent_slot).unwrap_or_default().to_vec();
                        let slot = self.path_based.then_some(current_path.as_str());
                        self.conditions.accumulate(field, slot, &inherited);
                    }
                    push_selections(&mut stack, &field.node.selection_set, field, false, &current_path);
                    continue;
                }
                Selection::InlineFragment(fragment) => (&fragment.node.selection_set, parent),
                Selection::FragmentSpread(spread) => match self.fragments.get(&spread.node.fragment_name.node) {
                    Some(fragment) => (&fragment.node.selection_set, parent),
                    None => continue,
                },
            };
            push_selections(&mut stack, selection_set, parent, true, &parent_path);
        }
    }

    /// A fragment applies when it has no type condition, when its condition is the runtime type
    /// itself or when the condition is an abstract type the runtime type belongs to.
    fn does_fragment_condition_match(&self, condition: Option<&str>, runtime_type: &str) -> bool {
        let Some(condition) = condition else {
            return true;
        };
        if condition == runtime_type {
            return true;
        }
        match self.schema.get(condition) {
            Some(ty) if ty.is_abstract() => self.schema.is_sub_type(condition, runtime_type),
            _ => false,
        }
    }
}

fn push_selections<'a>(
    stack: &mut Vec<PendingSelection<'a>>,
    selection_set: &'a Positioned<SelectionSet>,
    parent: &'a Positioned<Field>,
    from_fragment: bool,
    parent_path: &str,
) {
    stack.extend(selection_set.node.items.iter().rev().map(|selection| PendingSelection {
        parent,
        selection,
        from_fragment,
        parent_path: parent_path.to_string(),
    }));
}
