///
/// PrimitiveModel
/// Scalar field metadata. Indexed primitives get a secondary index.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrimitiveModel {
    pub name: String,
    pub indexed: bool,
}

impl PrimitiveModel {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed: false,
        }
    }

    #[must_use]
    pub fn indexed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexed: true,
        }
    }
}
