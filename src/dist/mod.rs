mod cdist;
mod ddist;

pub use cdist::CDist;
pub use ddist::DDist;

/// A leaf prediction: either a discrete class distribution or a continuous
/// running mean/variance, depending on the schema's class attribute type.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafDist {
    Discrete(DDist),
    Continuous(CDist),
}

impl LeafDist {
    pub fn is_empty(&self) -> bool {
        match self {
            LeafDist::Discrete(d) => d.is_empty(),
            LeafDist::Continuous(c) => c.is_empty(),
        }
    }

    pub fn as_discrete(&self) -> Option<&DDist> {
        match self {
            LeafDist::Discrete(d) => Some(d),
            LeafDist::Continuous(_) => None,
        }
    }

    pub fn as_continuous(&self) -> Option<&CDist> {
        match self {
            LeafDist::Continuous(c) => Some(c),
            LeafDist::Discrete(_) => None,
        }
    }
}
