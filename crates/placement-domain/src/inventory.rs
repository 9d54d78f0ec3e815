//! Inventory Accountant: pure computation of effective capacity and
//! availability for a `(provider, resource_class)` pair.
//!
//! Every function here is a pure function of its arguments — no I/O, no
//! shared state — so the matcher can call it freely while holding
//! provider-tree data already fetched from the graph store.

use crate::entities::InventoryRecord;

/// *Effective capacity*: `floor((total - reserved) * allocation_ratio)`.
///
/// All arithmetic up to the multiplication is integral; the multiplication
/// by `allocation_ratio` is performed in double precision and then
/// floored, per spec §4.4.
#[must_use]
pub fn effective_capacity(inventory: &InventoryRecord) -> u32 {
    let usable = f64::from(inventory.total - inventory.reserved);
    let capacity = (usable * inventory.allocation_ratio).floor();
    if capacity <= 0.0 {
        0
    } else {
        capacity as u32
    }
}

/// *Available*: `capacity - used_total`, saturating at zero (usage can
/// never legitimately exceed capacity, but saturating keeps this function
/// total rather than panicking on inconsistent stored data).
#[must_use]
pub fn effective_available(inventory: &InventoryRecord, used_total: u32) -> u32 {
    effective_capacity(inventory).saturating_sub(used_total)
}

/// Whether a request for `amount` units is satisfiable against this
/// inventory given `used_total` already consumed.
///
/// Per spec §4.4, all of the following must hold:
/// - `amount >= min_unit`
/// - `amount <= max_unit`
/// - `amount % step_size == 0`
/// - `amount <= available`
#[must_use]
pub fn is_satisfiable(inventory: &InventoryRecord, used_total: u32, amount: u32) -> bool {
    if amount == 0 {
        return false;
    }
    if amount < inventory.min_unit || amount > inventory.max_unit {
        return false;
    }
    if amount % inventory.step_size != 0 {
        return false;
    }
    amount <= effective_available(inventory, used_total)
}
