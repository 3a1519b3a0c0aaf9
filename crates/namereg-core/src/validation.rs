//! Input validation: length bounds, reveal checks and transaction structure.
//!
//! Everything here runs before an output is built. Nothing in this module
//! touches a wallet or the ledger.

use crate::commitment::Salt;
use crate::error::ValidationError;
use crate::nameop::NameOp;
use crate::transaction::Transaction;
use crate::types::{Name, Value};

/// Check that a name is non-empty and at most `max` bytes.
pub fn validate_name(name: &Name, max: usize) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.len() > max {
        return Err(ValidationError::NameTooLong {
            len: name.len(),
            max,
        });
    }
    Ok(())
}

/// Check that a value is at most `max` bytes. Empty values are allowed.
pub fn validate_value(value: &Value, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::ValueTooLong {
            len: value.len(),
            max,
        });
    }
    Ok(())
}

/// Check that `prev` is a commit that `salt` and `name` open.
///
/// 1. The previous operation must be `New`
/// 2. Its commitment must equal `RIPEMD160(SHA256(salt || name))`
pub fn check_reveal(prev: &NameOp, name: &Name, salt: &Salt) -> Result<(), ValidationError> {
    let NameOp::New { commitment } = prev else {
        return Err(ValidationError::NotACommit);
    };
    if !commitment.verify(salt, name) {
        return Err(ValidationError::CommitmentMismatch);
    }
    Ok(())
}

/// Structural checks on a transaction about to be queued or broadcast.
///
/// 1. At least one input
/// 2. At least one output
/// 3. At most one name operation
pub fn validate_transaction_structure(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::NoOutputs);
    }
    let name_ops = tx.name_output_count();
    if name_ops > 1 {
        return Err(ValidationError::MultipleNameOutputs(name_ops));
    }
    Ok(())
}
