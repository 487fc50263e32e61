//! The execution plan: a tree of typed nodes compiled once per operation and interpreted by the
//! executor for every call.

mod compile;
mod registries;
mod resolve_info;
pub(crate) mod shape;

use std::{fmt, sync::Arc};

use async_graphql_parser::types::OperationType;
use indexmap::IndexMap;

pub(crate) use compile::compile_plan;
pub(crate) use registries::*;
pub use resolve_info::ResolveInfo;
pub(crate) use resolve_info::{ResolveInfoScope, ResolveInfoTemplate};

use crate::operation::coercion::ArgumentTemplate;

pub(crate) struct Plan {
    pub kind: OperationType,
    pub root: ObjectNode,
    pub registries: Registries,
    pub subscription: Option<SubscriptionRoot>,
}

/// Root field of a subscription, whose subscriber produces the event stream.
pub(crate) struct SubscriptionRoot {
    pub key: Arc<str>,
    pub field_name: String,
    pub subscriber: Option<ResolverId>,
    pub arguments: ArgumentTemplate,
    pub info: ResolveInfoId,
    pub site: FieldSiteId,
    pub non_null: bool,
}

/// Completes a value at one position of the response.
pub(crate) struct Node {
    pub non_null: bool,
    pub site: FieldSiteId,
    pub kind: NodeKind,
}

pub(crate) enum NodeKind {
    Leaf(LeafNode),
    Object(ObjectNode),
    List(Arc<Node>),
    Abstract(AbstractNode),
}

pub(crate) struct LeafNode {
    pub type_name: String,
    /// `None` when the value is written as is.
    pub serializer: Option<SerializerId>,
}

pub(crate) struct ObjectNode {
    pub type_name: String,
    pub is_type_of: Option<IsTypeOfId>,
    pub fields: Vec<ObjectField>,
}

pub(crate) struct ObjectField {
    pub key: Arc<str>,
    /// `None` when the field is always included.
    pub condition: Option<ConditionId>,
    pub kind: FieldKind,
}

pub(crate) enum FieldKind {
    Typename,
    /// Read from the parent value and completed in place.
    Inline { field_name: String, node: Arc<Node> },
    /// Produced by a resolver.
    Deferred(Arc<DeferredField>),
}

pub(crate) struct DeferredField {
    pub field_name: String,
    pub resolver: ResolverId,
    pub arguments: ArgumentTemplate,
    pub info: ResolveInfoId,
    pub node: Arc<Node>,
}

pub(crate) struct AbstractNode {
    pub type_name: String,
    pub resolution: TypeResolutionId,
    pub info: ResolveInfoId,
    /// Compiled selection of every possible type.
    pub branches: IndexMap<String, Arc<Node>>,
}

impl Node {
    pub fn is_nullable(&self) -> bool {
        !self.non_null
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.kind, self.root.type_name)?;
        self.root.render(f, 1)?;
        if let Some(subscription) = &self.subscription {
            writeln!(
                f,
                "subscribe {} ({})",
                subscription.field_name,
                if subscription.subscriber.is_some() {
                    "subscriber"
                } else {
                    "no subscriber"
                }
            )?;
        }
        write!(f, "{:?}", self.registries)
    }
}

impl ObjectNode {
    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for field in &self.fields {
            write!(f, "{:indent$}{}", "", field.key, indent = depth * 2)?;
            if let Some(condition) = field.condition {
                write!(f, " if #{}", usize::from(condition))?;
            }
            match &field.kind {
                FieldKind::Typename => writeln!(f, ": __typename")?,
                FieldKind::Inline { field_name, node } => {
                    write!(f, ": .{field_name} ")?;
                    node.render(f, depth)?;
                }
                FieldKind::Deferred(deferred) => {
                    write!(f, ": resolve {} ", deferred.field_name)?;
                    deferred.node.render(f, depth)?;
                }
            }
        }
        Ok(())
    }
}

impl Node {
    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let bang = if self.non_null { "!" } else { "" };
        match &self.kind {
            NodeKind::Leaf(leaf) => writeln!(f, "{}{bang}", leaf.type_name),
            NodeKind::Object(object) => {
                writeln!(f, "{}{bang}", object.type_name)?;
                object.render(f, depth + 1)
            }
            NodeKind::List(item) => {
                write!(f, "list{bang} of ")?;
                item.render(f, depth)
            }
            NodeKind::Abstract(node) => {
                writeln!(f, "{}{bang}", node.type_name)?;
                for (type_name, branch) in &node.branches {
                    write!(f, "{:indent$}... on {type_name} ", "", indent = (depth + 1) * 2)?;
                    branch.render(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}
