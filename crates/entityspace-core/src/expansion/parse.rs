use crate::{
    config::CoreConfig,
    error::{ErrorClass, ErrorOrigin, InternalError},
    expansion::Expansion,
    model::{EntityId, Schema, SchemaError},
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// ExpansionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExpansionError {
    #[error("unknown navigation property: {name} (on '{entity}')")]
    UnknownNavigation { entity: String, name: String },

    #[error("no closing brace in expansion '{0}'")]
    UnclosedBrace(String),

    #[error("unexpected closing brace in expansion '{0}'")]
    UnexpectedClosingBrace(String),

    #[error("unexpected input after closing brace in expansion '{0}'")]
    TrailingInput(String),

    #[error("empty segment in expansion '{0}'")]
    EmptySegment(String),

    #[error("expansion nests deeper than {max} levels")]
    TooDeep { max: usize },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<ExpansionError> for InternalError {
    fn from(err: ExpansionError) -> Self {
        match err {
            ExpansionError::Schema(inner) => inner.into(),
            other => Self::new(ErrorClass::Invalid, ErrorOrigin::Expansion, other.to_string()),
        }
    }
}

/// Parse `text` into expansions rooted at `owner`, with default limits.
///
/// Grammar, whitespace ignored:
///
/// ```text
/// list      := item ("," item)*
/// item      := name ("/" (item | "{" list "}"))?
/// ```
///
/// An empty string yields no expansions.
pub fn parse(
    schema: &Schema,
    owner: EntityId,
    text: &str,
) -> Result<Vec<Expansion>, ExpansionError> {
    parse_with(schema, owner, text, &CoreConfig::default())
}

/// [`parse`] with explicit limits.
pub fn parse_with(
    schema: &Schema,
    owner: EntityId,
    text: &str,
    config: &CoreConfig,
) -> Result<Vec<Expansion>, ExpansionError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        // still reject an unknown owner
        schema.entity(owner)?;
        return Ok(Vec::new());
    }

    let parser = Parser {
        schema,
        max_depth: config.max_expansion_depth,
    };
    let items = split_top_level(&compact)?
        .into_iter()
        .map(|item| parser.item(owner, item, 1))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(super::normalize(items))
}

struct Parser<'a> {
    schema: &'a Schema,
    max_depth: usize,
}

impl Parser<'_> {
    fn item(
        &self,
        owner: EntityId,
        text: &str,
        depth: usize,
    ) -> Result<Expansion, ExpansionError> {
        if depth > self.max_depth {
            return Err(ExpansionError::TooDeep {
                max: self.max_depth,
            });
        }

        let (name, rest) = match text.split_once('/') {
            Some((name, rest)) => (name, Some(rest)),
            None => (text, None),
        };
        if name.is_empty() {
            return Err(ExpansionError::EmptySegment(text.to_string()));
        }

        let model = self.schema.entity(owner)?;
        let property = model
            .navigation(name)
            .ok_or_else(|| ExpansionError::UnknownNavigation {
                entity: model.name().to_string(),
                name: name.to_string(),
            })?;
        let target = property.target;

        let children = match rest {
            None => Vec::new(),
            Some("") => return Err(ExpansionError::EmptySegment(text.to_string())),
            Some(rest) if rest.starts_with('{') => {
                let close = matching_brace(rest)?;
                if close + 1 != rest.len() {
                    return Err(ExpansionError::TrailingInput(text.to_string()));
                }

                split_top_level(&rest[1..close])?
                    .into_iter()
                    .map(|child| self.item(target, child, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?
            }
            Some(rest) => vec![self.item(target, rest, depth + 1)?],
        };

        Ok(Expansion::new(Arc::clone(property), children))
    }
}

// Split on commas outside braces; rejects empty pieces and unbalanced braces.
fn split_top_level(text: &str) -> Result<Vec<&str>, ExpansionError> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ExpansionError::UnexpectedClosingBrace(text.to_string()))?;
            }
            ',' if depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth > 0 {
        return Err(ExpansionError::UnclosedBrace(text.to_string()));
    }
    pieces.push(&text[start..]);

    if pieces.iter().any(|piece| piece.is_empty()) {
        return Err(ExpansionError::EmptySegment(text.to_string()));
    }

    Ok(pieces)
}

// Byte offset of the brace closing the one at offset 0.
fn matching_brace(text: &str) -> Result<usize, ExpansionError> {
    let mut depth = 0usize;

    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }

    Err(ExpansionError::UnclosedBrace(text.to_string()))
}
