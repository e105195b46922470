//! Transition validation and progress mapping.
//!
//! Describes which state-to-state moves are legal and how far along an
//! order is. The orchestrator enforces ordering through its types; this
//! table exists for external monitoring and testing.

use std::collections::{HashMap, HashSet};

use fulfillment_types::{OrderProcessingState, StateKind};
use once_cell::sync::Lazy;

// Static transition table - each state maps to its allowed successors.
static TRANSITIONS: Lazy<HashMap<StateKind, HashSet<StateKind>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		StateKind::Input,
		HashSet::from([StateKind::ValidatedCart, StateKind::Failed]),
	);
	m.insert(
		StateKind::ValidatedCart,
		HashSet::from([StateKind::CalculatedShipping, StateKind::Failed]),
	);
	m.insert(
		StateKind::CalculatedShipping,
		HashSet::from([StateKind::ProcessedPayment, StateKind::Failed]),
	);
	m.insert(
		StateKind::ProcessedPayment,
		HashSet::from([StateKind::AllocatedInventory, StateKind::Failed]),
	);
	m.insert(
		StateKind::AllocatedInventory,
		HashSet::from([StateKind::Completed, StateKind::Failed]),
	);
	m.insert(StateKind::Completed, HashSet::new()); // terminal
	m.insert(StateKind::Failed, HashSet::new()); // terminal
	m
});

/// Checks whether the pipeline may move from `from` to `to`.
pub fn is_valid_transition(from: StateKind, to: StateKind) -> bool {
	TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
}

/// Progress percentage for monitoring. `Failed` reports the -1 sentinel
/// rather than a percentage.
pub fn state_progress(state: &OrderProcessingState) -> i8 {
	match state.kind() {
		StateKind::Input => 0,
		StateKind::ValidatedCart => 20,
		StateKind::CalculatedShipping => 40,
		StateKind::ProcessedPayment => 60,
		StateKind::AllocatedInventory => 80,
		StateKind::Completed => 100,
		StateKind::Failed => -1,
	}
}
