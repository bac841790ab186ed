//! Expansion trees: which navigation properties an operation follows, and
//! how deep.
//!
//! Invariants:
//! - Every node's property is valid for its position (guaranteed by `parse`).
//! - Siblings never repeat a property; repeated siblings are merged.
//! - Siblings are sorted by property name, ties broken by canonical form.
//! - Nodes are immutable; `extract` builds new trees.
mod extraction;
mod parse;
mod path;


use crate::{
    config::CoreConfig,
    model::{EntityId, NavigationModel, Schema},
};
use std::{
    fmt::{self, Display},
    sync::{Arc, OnceLock},
};

// re-exports
pub use extraction::Extraction;
pub use parse::{ExpansionError, parse, parse_with};
pub use path::Path;

///
/// Expansion
///

#[derive(Clone, Debug)]
pub struct Expansion {
    property: Arc<NavigationModel>,
    children: Vec<Self>,
    canonical: OnceLock<String>,
}

impl Expansion {
    /// Shorthand for [`parse()`].
    pub fn parse(
        schema: &Schema,
        owner: EntityId,
        text: &str,
    ) -> Result<Vec<Self>, ExpansionError> {
        parse::parse(schema, owner, text)
    }

    /// Shorthand for [`parse_with()`].
    pub fn parse_with(
        schema: &Schema,
        owner: EntityId,
        text: &str,
        config: &CoreConfig,
    ) -> Result<Vec<Self>, ExpansionError> {
        parse::parse_with(schema, owner, text, config)
    }

    pub(crate) fn new(property: Arc<NavigationModel>, children: Vec<Self>) -> Self {
        Self {
            property,
            children: normalize(children),
            canonical: OnceLock::new(),
        }
    }

    /// The navigation property this node expands.
    #[must_use]
    pub fn property(&self) -> &Arc<NavigationModel> {
        &self.property
    }

    /// Property name, shorthand for `property().name`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.property.name
    }

    /// Child expansions in canonical order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Canonical string form, computed once.
    #[must_use]
    pub fn canonical(&self) -> &str {
        self.canonical.get_or_init(|| {
            let mut out = self.property.name.clone();
            if !self.children.is_empty() {
                out.push('/');
                out.push_str(&render_all(&self.children));
            }
            out
        })
    }

    //
    // Superset ordering
    //

    /// `x ⊇ y`: same property, and x's children dominate y's children.
    #[must_use]
    pub fn is_superset(x: &Self, y: &Self) -> bool {
        x.property == y.property
            && x.children.len() >= y.children.len()
            && Self::is_superset_all(&x.children, &y.children)
    }

    /// Sequence form of [`Expansion::is_superset`]: every element of `ys`
    /// is dominated by a distinct element of `xs` on the same property.
    #[must_use]
    pub fn is_superset_all(xs: &[Self], ys: &[Self]) -> bool {
        if xs.len() < ys.len() {
            return false;
        }

        let xs = sorted(xs);
        let ys = sorted(ys);
        let mut used = vec![false; xs.len()];
        let mut start = 0;

        for y in ys {
            while start < xs.len() && xs[start].name() < y.name() {
                start += 1;
            }

            let matched = (start..xs.len())
                .take_while(|&i| xs[i].name() == y.name())
                .find(|&i| !used[i] && Self::is_superset(xs[i], y));

            match matched {
                Some(i) => used[i] = true,
                None => return false,
            }
        }

        true
    }

    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        Self::is_superset(self, other)
    }

    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        Self::is_superset(other, self)
    }

    //
    // Structure
    //

    /// Cut every descendant whose property is in `props`.
    ///
    /// Returns the reduced tree plus one extraction per cut. A matching child
    /// is cut whole; its own descendants are not inspected. Extraction paths
    /// start at this node and end at the parent of the cut.
    #[must_use]
    pub fn extract(&self, props: &[Arc<NavigationModel>]) -> (Self, Vec<Extraction>) {
        let mut kept = Vec::with_capacity(self.children.len());
        let mut extractions = Vec::new();

        for child in &self.children {
            if contains(props, &child.property) {
                extractions.push(Extraction::new(
                    Some(Path::new(Arc::clone(&self.property))),
                    child.clone(),
                ));
            } else {
                let (reduced, nested) = child.extract(props);
                extractions.extend(
                    nested
                        .into_iter()
                        .map(|e| e.prefixed(Arc::clone(&self.property))),
                );
                kept.push(reduced);
            }
        }

        (Self::new(Arc::clone(&self.property), kept), extractions)
    }

    /// One root-to-leaf path per leaf of this tree.
    #[must_use]
    pub fn to_paths(&self) -> Vec<Path> {
        if self.children.is_empty() {
            return vec![Path::new(Arc::clone(&self.property))];
        }

        self.children
            .iter()
            .flat_map(Self::to_paths)
            .map(|path| path.prepend(Arc::clone(&self.property)))
            .collect()
    }

    /// Total number of nodes in this tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }
}

impl PartialEq for Expansion {
    fn eq(&self, other: &Self) -> bool {
        self.property == other.property && self.canonical() == other.canonical()
    }
}

impl Eq for Expansion {}

impl Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

///
/// Set-level helpers
///

/// Cut `props` out of a top-level expansion set. Top-level cuts carry no path.
#[must_use]
pub fn extract_all(
    expansions: &[Expansion],
    props: &[Arc<NavigationModel>],
) -> (Vec<Expansion>, Vec<Extraction>) {
    let mut kept = Vec::with_capacity(expansions.len());
    let mut extractions = Vec::new();

    for expansion in expansions {
        if contains(props, &expansion.property) {
            extractions.push(Extraction::new(None, expansion.clone()));
        } else {
            let (reduced, nested) = expansion.extract(props);
            extractions.extend(nested);
            kept.push(reduced);
        }
    }

    (normalize(kept), extractions)
}

/// Render a sibling set: `a`, `{a,b}`, or empty.
#[must_use]
pub fn render_all(expansions: &[Expansion]) -> String {
    let parts: Vec<&str> = expansions.iter().map(Expansion::canonical).collect();

    match parts.len() {
        0 => String::new(),
        1 => parts[0].to_string(),
        _ => format!("{{{}}}", parts.join(",")),
    }
}

/// Merge siblings that expand the same property and sort into canonical order.
#[must_use]
pub fn normalize(expansions: Vec<Expansion>) -> Vec<Expansion> {
    let mut merged: Vec<Expansion> = Vec::with_capacity(expansions.len());

    for expansion in expansions {
        match merged
            .iter_mut()
            .find(|existing| existing.property == expansion.property)
        {
            Some(existing) => {
                let mut children = std::mem::take(&mut existing.children);
                children.extend(expansion.children);
                *existing = Expansion::new(Arc::clone(&existing.property), children);
            }
            None => merged.push(expansion),
        }
    }

    merged.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.canonical().cmp(b.canonical()))
    });

    merged
}

fn sorted(expansions: &[Expansion]) -> Vec<&Expansion> {
    let mut refs: Vec<&Expansion> = expansions.iter().collect();
    refs.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.canonical().cmp(b.canonical()))
    });

    refs
}

fn contains(props: &[Arc<NavigationModel>], property: &NavigationModel) -> bool {
    props.iter().any(|p| p.as_ref() == property)
}
