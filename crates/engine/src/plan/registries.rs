use std::{fmt, num::NonZero};

use async_graphql_parser::{types::Field, Positioned};
use error::Location;

use super::ResolveInfoTemplate;
use crate::{
    operation::condition::Condition,
    schema::{IsTypeOf, LeafSerializer, Resolver, TypeResolver},
};

macro_rules! registries {
    ($($id:ident, $field:ident, $push:ident: $ty:ty;)*) => {
        $(
            #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
            pub(crate) struct $id(NonZero<u32>);

            impl From<usize> for $id {
                fn from(index: usize) -> Self {
                    $id(NonZero::<u32>::MIN.saturating_add(index as u32))
                }
            }

            impl From<$id> for usize {
                fn from(id: $id) -> Self {
                    (id.0.get() - 1) as usize
                }
            }

            impl std::ops::Index<$id> for Registries {
                type Output = $ty;

                fn index(&self, id: $id) -> &Self::Output {
                    &self.$field[usize::from(id)]
                }
            }
        )*

        /// Everything the plan nodes refer to by id, immutable once compiled.
        #[derive(Default)]
        pub(crate) struct Registries {
            $(pub $field: Vec<$ty>,)*
        }

        impl Registries {
            $(
                pub fn $push(&mut self, value: $ty) -> $id {
                    self.$field.push(value);
                    $id::from(self.$field.len() - 1)
                }
            )*
        }

        impl fmt::Debug for Registries {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct("Registries")
                    $(.field(stringify!($field), &self.$field.len()))*
                    .finish()
            }
        }
    };
}

registries! {
    ResolverId, resolvers, push_resolver: Resolver;
    SerializerId, serializers, push_serializer: LeafSerializer;
    TypeResolutionId, type_resolutions, push_type_resolution: TypeResolution;
    IsTypeOfId, is_type_ofs, push_is_type_of: IsTypeOf;
    ResolveInfoId, resolve_infos, push_resolve_info: ResolveInfoTemplate;
    FieldSiteId, field_sites, push_field_site: FieldSite;
    ConditionId, conditions, push_condition: Condition;
}

/// How the concrete type of an abstract value is found.
#[derive(Clone)]
pub(crate) enum TypeResolution {
    Custom(TypeResolver),
    /// `__typename` of the value, then the `is_type_of` checks of the possible types.
    Default { possible_types: Vec<(String, Option<IsTypeOf>)> },
}

/// Where a selected field sits in the operation, shared by all the errors raised for it.
#[derive(Debug, Clone)]
pub(crate) struct FieldSite {
    pub parent_type: String,
    /// `name`, or `(a,b)` when several nodes were merged under the response key.
    pub display_name: String,
    pub locations: Vec<Location>,
}

impl FieldSite {
    pub fn new(parent_type: &str, field_nodes: &[&Positioned<Field>]) -> Self {
        let display_name = match field_nodes {
            [node] => node.node.name.node.to_string(),
            nodes => format!(
                "({})",
                nodes
                    .iter()
                    .map(|node| node.node.name.node.as_str())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        };
        FieldSite {
            parent_type: parent_type.to_string(),
            display_name,
            locations: field_nodes
                .iter()
                .map(|node| crate::operation::location(node.pos))
                .collect(),
        }
    }

    /// `Parent.field` as used in error messages.
    pub fn coordinate(&self) -> String {
        format!("{}.{}", self.parent_type, self.display_name)
    }
}
