//! Capability oracle: read-only grant-state queries
//!
//! The oracle is the flow's window into the platform. Hosts implement it on
//! top of whatever permission API their OS exposes; the flow never mutates
//! grant state through it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use capflow_api::CapabilityStatus;

/// Trait for querying the platform's capability grant state
///
/// Both queries are synchronous and side-effect-free: at most one platform
/// call per identifier, no mutation. Implementations must return an entry
/// for every identifier they are asked about; an unknown identifier is a
/// programming error in the host, not a runtime condition the flow recovers
/// from.
pub trait CapabilityOracle: Send + Sync {
    /// Current grant status for each of the given capabilities.
    fn query_status(&self, capabilities: &[String]) -> BTreeMap<String, CapabilityStatus>;

    /// Whether an explanatory rationale should be shown for a capability.
    ///
    /// True only when the user denied the capability by explicit action at
    /// least once and has not permanently blocked it. This is the
    /// platform's heuristic and the flow treats it as ground truth.
    fn should_show_rationale(&self, capability: &str) -> bool;
}

// ============================================================================
// In-memory Oracle (tests, demos)
// ============================================================================

/// In-memory oracle with scripted answers
///
/// Lets tests and demos stand in for a real platform: statuses and
/// rationale eligibility are set up front and can be mutated between flow
/// events to simulate the user changing grants out of band.
#[derive(Debug, Default)]
pub struct MemoryOracle {
    statuses: RwLock<BTreeMap<String, CapabilityStatus>>,
    rationale: RwLock<BTreeSet<String>>,
    query_count: RwLock<usize>,
}

impl MemoryOracle {
    /// Create an oracle with no known capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the status reported for a capability.
    pub fn set_status(&self, capability: impl Into<String>, status: CapabilityStatus) {
        self.statuses.write().unwrap().insert(capability.into(), status);
    }

    /// Set whether the rationale heuristic fires for a capability.
    pub fn set_rationale(&self, capability: impl Into<String>, eligible: bool) {
        let capability = capability.into();
        let mut rationale = self.rationale.write().unwrap();
        if eligible {
            rationale.insert(capability);
        } else {
            rationale.remove(&capability);
        }
    }

    /// Number of `query_status` calls issued so far.
    pub fn query_count(&self) -> usize {
        *self.query_count.read().unwrap()
    }
}

impl CapabilityOracle for MemoryOracle {
    /// # Panics
    ///
    /// Panics on an identifier that was never configured; the scripted
    /// oracle treats that as a broken test setup.
    fn query_status(&self, capabilities: &[String]) -> BTreeMap<String, CapabilityStatus> {
        *self.query_count.write().unwrap() += 1;
        let statuses = self.statuses.read().unwrap();
        capabilities
            .iter()
            .map(|capability| {
                let status = statuses.get(capability).copied().unwrap_or_else(|| {
                    panic!("MemoryOracle: unknown capability '{capability}'")
                });
                (capability.clone(), status)
            })
            .collect()
    }

    fn should_show_rationale(&self, capability: &str) -> bool {
        self.rationale.read().unwrap().contains(capability)
    }
}
