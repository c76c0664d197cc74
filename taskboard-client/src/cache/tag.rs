/// Cache tags
///
/// Reads declare the tags their response provides; writes declare the tags
/// they invalidate. A tag is a kind plus an optional id. The bare tag (no id)
/// stands for the whole collection.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Projects,
    Tasks,
    Users,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Projects => "Projects",
            TagKind::Tasks => "Tasks",
            TagKind::Users => "Users",
        }
    }
}

/// Cache tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<i64>,
}

impl Tag {
    /// Collection-level tag
    pub const fn all(kind: TagKind) -> Self {
        Tag { kind, id: None }
    }

    /// Tag for a single entity
    pub const fn id(kind: TagKind, id: i64) -> Self {
        Tag { kind, id: Some(id) }
    }

    pub const fn projects() -> Self {
        Self::all(TagKind::Projects)
    }

    pub const fn tasks() -> Self {
        Self::all(TagKind::Tasks)
    }

    pub const fn task(id: i64) -> Self {
        Self::id(TagKind::Tasks, id)
    }

    pub const fn users() -> Self {
        Self::all(TagKind::Users)
    }

    pub fn is_collection(&self) -> bool {
        self.id.is_none()
    }

    /// Whether invalidating `invalidated` affects a query providing `self`
    ///
    /// Same kind is required. A bare tag on either side matches any id.
    pub fn matches(&self, invalidated: &Tag) -> bool {
        if self.kind != invalidated.kind {
            return false;
        }
        match (self.id, invalidated.id) {
            (Some(provided), Some(target)) => provided == target,
            _ => true,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}({})", self.kind.as_str(), id),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

/// Tags for a list of tasks: one per task, or the collection tag when empty
pub fn task_list_tags<I>(ids: I) -> Vec<Tag>
where
    I: IntoIterator<Item = i64>,
{
    let tags: Vec<Tag> = ids.into_iter().map(Tag::task).collect();
    if tags.is_empty() {
        vec![Tag::tasks()]
    } else {
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_rules() {
        // id vs id
        assert!(Tag::task(1).matches(&Tag::task(1)));
        assert!(!Tag::task(1).matches(&Tag::task(2)));

        // bare invalidation hits every id of the kind
        assert!(Tag::task(1).matches(&Tag::tasks()));

        // bare provision is hit by any id of the kind
        assert!(Tag::tasks().matches(&Tag::task(9)));

        // kinds never cross
        assert!(!Tag::projects().matches(&Tag::tasks()));
        assert!(!Tag::id(TagKind::Users, 1).matches(&Tag::task(1)));
    }

    #[test]
    fn test_task_list_tags() {
        assert_eq!(task_list_tags(Vec::new()), vec![Tag::tasks()]);
        assert_eq!(task_list_tags([3, 4]), vec![Tag::task(3), Tag::task(4)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::task(7).to_string(), "Tasks(7)");
        assert_eq!(Tag::users().to_string(), "Users");
    }
}
