//! Task id → ledger-native numeric identifier.

use crewforge_core::TaskId;

/// Encode a task id into the ledger's unsigned-integer identifier space.
///
/// Strips the structural separators from the uuid and reinterprets the 32
/// remaining hex digits as a u128. Deterministic and collision-free within
/// the uuid space (it is a bijection on the 128 bits).
pub fn encode_task_id(task_id: TaskId) -> u128 {
    task_id.as_uuid().as_u128()
}
