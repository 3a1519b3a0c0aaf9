//! Name operations carried by transaction outputs.

use crate::commitment::{Commitment, Salt};
use crate::types::{Name, Value};

/// Discriminant of a [`NameOp`], as encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NameOpKind {
    New = 1,
    FirstUpdate = 2,
    Update = 3,
}

impl NameOpKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::New),
            2 => Some(Self::FirstUpdate),
            3 => Some(Self::Update),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// A name operation.
///
/// `New` hides the name behind a commitment. `FirstUpdate` opens it and sets
/// the initial value. `Update` changes the value or moves the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOp {
    New { commitment: Commitment },
    FirstUpdate { name: Name, value: Value, salt: Salt },
    Update { name: Name, value: Value },
}

impl NameOp {
    pub fn kind(&self) -> NameOpKind {
        match self {
            Self::New { .. } => NameOpKind::New,
            Self::FirstUpdate { .. } => NameOpKind::FirstUpdate,
            Self::Update { .. } => NameOpKind::Update,
        }
    }

    /// The name this operation acts on. `None` for a commit, which hides it.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Self::New { .. } => None,
            Self::FirstUpdate { name, .. } | Self::Update { name, .. } => Some(name),
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::New { .. } => None,
            Self::FirstUpdate { value, .. } | Self::Update { value, .. } => Some(value),
        }
    }

    /// `FirstUpdate` and `Update` both make a name active.
    pub fn is_update(&self) -> bool {
        !matches!(self, Self::New { .. })
    }

    pub fn commitment(&self) -> Option<&Commitment> {
        match self {
            Self::New { commitment } => Some(commitment),
            _ => None,
        }
    }
}
