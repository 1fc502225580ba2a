//! Reading and writing the checkpoint field of the state map.

use relay_types::{CheckpointPosition, CheckpointStore, Scope, LAST_TX_ID_KEY};

use crate::error::CheckpointError;

/// Reads the last checkpointed position. A missing field is the tip sentinel.
///
/// # Errors
///
/// Returns `CheckpointError` if the store call fails or the stored value is
/// not a transaction id.
pub fn load_position<S>(store: &S, scope: Scope) -> Result<CheckpointPosition, CheckpointError>
where
    S: CheckpointStore + ?Sized,
{
    let state = store.get(scope)?;
    let position =
        CheckpointPosition::from_state_value(state.get(LAST_TX_ID_KEY).map(String::as_str))?;
    Ok(position)
}

/// Writes `position` back with a read-modify-write of the whole state map,
/// so keys owned by someone else survive.
///
/// This is not a compare-and-swap; two writers sharing a store can
/// overwrite each other.
///
/// # Errors
///
/// Returns `CheckpointError::Store` if either the read or the write fails.
pub fn persist_position<S>(
    store: &S,
    scope: Scope,
    position: CheckpointPosition,
) -> Result<(), CheckpointError>
where
    S: CheckpointStore + ?Sized,
{
    let mut state = store.get(scope)?;
    state.insert(LAST_TX_ID_KEY.to_string(), position.to_state_value());
    store.set(&state, scope)?;
    Ok(())
}
