use crate::model::NavigationModel;
use std::{
    fmt::{self, Display},
    sync::Arc,
};

///
/// Path
///
/// Singly-linked, non-branching chain of navigation properties.
/// Records where inside an expansion tree something sits.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path {
    property: Arc<NavigationModel>,
    next: Option<Box<Self>>,
}

impl Path {
    #[must_use]
    pub const fn new(property: Arc<NavigationModel>) -> Self {
        Self {
            property,
            next: None,
        }
    }

    /// New path with `property` in front of `self`.
    #[must_use]
    pub fn prepend(self, property: Arc<NavigationModel>) -> Self {
        Self {
            property,
            next: Some(Box::new(self)),
        }
    }

    #[must_use]
    pub const fn property(&self) -> &Arc<NavigationModel> {
        &self.property
    }

    #[must_use]
    pub fn next(&self) -> Option<&Self> {
        self.next.as_deref()
    }

    /// Iterate the properties from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<NavigationModel>> {
        std::iter::successors(Some(self), |p| p.next()).map(|p| &p.property)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A path always has at least one segment.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Last property of the chain.
    #[must_use]
    pub fn last(&self) -> &Arc<NavigationModel> {
        let mut current = self;
        while let Some(next) = current.next() {
            current = next;
        }

        &current.property
    }

    /// Concatenate `tail` after the last segment of `self`.
    #[must_use]
    pub fn join(self, tail: Self) -> Self {
        match self.next {
            None => Self {
                property: self.property,
                next: Some(Box::new(tail)),
            },
            Some(next) => Self {
                property: self.property,
                next: Some(Box::new(next.join(tail))),
            },
        }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, property) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&property.name)?;
        }

        Ok(())
    }
}
