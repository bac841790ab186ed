use crate::{
    expansion::{Expansion, path::Path},
    model::NavigationModel,
};
use std::sync::Arc;

///
/// Extraction
///
/// A subtree cut out of an expansion tree, plus where it was cut.
/// `path` is `None` when the cut happened at the query root.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extraction {
    path: Option<Path>,
    extracted: Expansion,
}

impl Extraction {
    #[must_use]
    pub const fn new(path: Option<Path>, extracted: Expansion) -> Self {
        Self { path, extracted }
    }

    #[must_use]
    pub const fn path(&self) -> Option<&Path> {
        self.path.as_ref()
    }

    #[must_use]
    pub const fn extracted(&self) -> &Expansion {
        &self.extracted
    }

    /// Paths of the original tree covered by the cut subtree, i.e. the
    /// extracted leaves re-anchored under `path`.
    #[must_use]
    pub fn full_paths(&self) -> Vec<Path> {
        self.extracted
            .to_paths()
            .into_iter()
            .map(|leaf| match &self.path {
                Some(prefix) => prefix.clone().join(leaf),
                None => leaf,
            })
            .collect()
    }

    pub(crate) fn prefixed(self, property: Arc<NavigationModel>) -> Self {
        let path = match self.path {
            Some(path) => path.prepend(property),
            None => Path::new(property),
        };

        Self {
            path: Some(path),
            extracted: self.extracted,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<Path>, Expansion) {
        (self.path, self.extracted)
    }
}
