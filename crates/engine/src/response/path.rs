use std::{fmt, sync::Arc};

use error::{ErrorPath, ErrorPathSegment, InsertIntoErrorPath};

/// Unique identifier of a value within the response. Used to propagate null at the right place
/// and to generate the appropriate error path for GraphQL errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseValueId {
    Field { key: Arc<str>, nullable: bool },
    Index { index: usize, nullable: bool },
}

impl ResponseValueId {
    pub fn is_nullable(&self) -> bool {
        match self {
            ResponseValueId::Field { nullable, .. } => *nullable,
            ResponseValueId::Index { nullable, .. } => *nullable,
        }
    }
}

impl InsertIntoErrorPath for &ResponseValueId {
    fn insert_into(self, path: &mut ErrorPath) {
        match self {
            ResponseValueId::Field { key, .. } => key.as_ref().insert_into(path),
            ResponseValueId::Index { index, .. } => index.insert_into(path),
        }
    }
}

/// Location of a value in the response being built, as an immutable linked list.
///
/// Cloning is cheap and extending a path never affects the paths it was derived from, so
/// continuations of pending resolvers can each keep their own.
#[derive(Clone, Default)]
pub struct ResponsePath(Option<Arc<PathNode>>);

struct PathNode {
    prev: ResponsePath,
    id: ResponseValueId,
    depth: usize,
}

impl ResponsePath {
    pub fn root() -> Self {
        ResponsePath(None)
    }

    #[must_use]
    pub fn field(&self, key: Arc<str>, nullable: bool) -> Self {
        self.push(ResponseValueId::Field { key, nullable })
    }

    #[must_use]
    pub fn index(&self, index: usize, nullable: bool) -> Self {
        self.push(ResponseValueId::Index { index, nullable })
    }

    fn push(&self, id: ResponseValueId) -> Self {
        ResponsePath(Some(Arc::new(PathNode {
            prev: self.clone(),
            id,
            depth: self.len() + 1,
        })))
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map(|node| node.depth).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn last(&self) -> Option<&ResponseValueId> {
        self.0.as_ref().map(|node| &node.id)
    }

    /// Segments from the most specific one up to the root.
    pub fn iter_rev(&self) -> impl Iterator<Item = &ResponseValueId> {
        let mut current = self.0.as_deref();
        std::iter::from_fn(move || {
            let node = current?;
            current = node.prev.0.as_deref();
            Some(&node.id)
        })
    }

    /// Segments from the root down to the most specific one.
    pub fn to_vec(&self) -> Vec<ResponseValueId> {
        let mut ids: Vec<_> = self.iter_rev().cloned().collect();
        ids.reverse();
        ids
    }

    pub fn to_error_path(&self) -> ErrorPath {
        let mut path = ErrorPath::default();
        for id in &self.to_vec() {
            id.insert_into(&mut path);
        }
        path
    }
}

impl From<&ResponseValueId> for ErrorPathSegment {
    fn from(id: &ResponseValueId) -> Self {
        match id {
            ResponseValueId::Field { key, .. } => ErrorPathSegment::Field(key.as_ref().into()),
            ResponseValueId::Index { index, .. } => ErrorPathSegment::Index(*index),
        }
    }
}

impl fmt::Debug for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_error_path().fmt(f)
    }
}
