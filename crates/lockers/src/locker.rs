use serde::Serialize;
use sha2::{Digest, Sha256};

use lockstream_core::{Entity, LockerId};

/// Aggregate root: Locker summary.
///
/// Counters are unsigned so they can never go negative; every decrement is
/// floored at zero. The state hash is recomputed by every mutating method, so
/// a `Locker` handed out by this type never carries a stale hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Locker {
    locker_id: LockerId,
    compartments: u64,
    active_reservations: u64,
    degraded_compartments: u64,
    state_hash: String,
}

impl Locker {
    /// A locker seen for the first time (all counters zero).
    pub fn new(locker_id: LockerId) -> Self {
        Self::from_counts(locker_id, 0, 0, 0)
    }

    /// Build a locker from its counters, computing the hash.
    pub fn from_counts(
        locker_id: LockerId,
        compartments: u64,
        active_reservations: u64,
        degraded_compartments: u64,
    ) -> Self {
        let mut locker = Self {
            locker_id,
            compartments,
            active_reservations,
            degraded_compartments,
            state_hash: String::new(),
        };
        locker.refresh_state_hash();
        locker
    }

    /// Rehydrate a persisted row verbatim (storage adapters only).
    ///
    /// The stored hash is kept as-is so that verification can detect rows whose
    /// hash no longer matches their counters.
    pub fn restore(
        locker_id: LockerId,
        compartments: u64,
        active_reservations: u64,
        degraded_compartments: u64,
        state_hash: String,
    ) -> Self {
        Self {
            locker_id,
            compartments,
            active_reservations,
            degraded_compartments,
            state_hash,
        }
    }

    pub fn locker_id(&self) -> &LockerId {
        &self.locker_id
    }

    pub fn compartments(&self) -> u64 {
        self.compartments
    }

    pub fn active_reservations(&self) -> u64 {
        self.active_reservations
    }

    pub fn degraded_compartments(&self) -> u64 {
        self.degraded_compartments
    }

    pub fn state_hash(&self) -> &str {
        &self.state_hash
    }

    /// Whether the stored hash matches the counters.
    pub fn hash_is_consistent(&self) -> bool {
        self.state_hash
            == state_hash(
                &self.locker_id,
                self.compartments,
                self.active_reservations,
                self.degraded_compartments,
            )
    }

    pub fn compartment_registered(&mut self) {
        self.compartments += 1;
        self.refresh_state_hash();
    }

    pub fn reservation_opened(&mut self) {
        self.active_reservations += 1;
        self.refresh_state_hash();
    }

    pub fn reservation_closed(&mut self) {
        self.active_reservations = self.active_reservations.saturating_sub(1);
        self.refresh_state_hash();
    }

    pub fn compartment_degraded(&mut self) {
        self.degraded_compartments += 1;
        self.refresh_state_hash();
    }

    pub fn compartment_recovered(&mut self) {
        self.degraded_compartments = self.degraded_compartments.saturating_sub(1);
        self.refresh_state_hash();
    }

    fn refresh_state_hash(&mut self) {
        self.state_hash = state_hash(
            &self.locker_id,
            self.compartments,
            self.active_reservations,
            self.degraded_compartments,
        );
    }
}

impl Entity for Locker {
    type Id = LockerId;

    fn id(&self) -> &Self::Id {
        &self.locker_id
    }
}

/// SHA-256 (lower-case hex) of the canonical locker summary.
///
/// The canonical form is compact JSON with keys in sorted order and every
/// character outside printable ASCII written as a `\uXXXX` escape:
/// `{"active_reservations":A,"compartments":C,"degraded_compartments":D,"locker_id":"L"}`.
/// Only the identity and the three counters participate.
pub fn state_hash(
    locker_id: &LockerId,
    compartments: u64,
    active_reservations: u64,
    degraded_compartments: u64,
) -> String {
    let quoted_id = ascii_json_string(locker_id.as_str());
    let canonical = format!(
        "{{\"active_reservations\":{active_reservations},\"compartments\":{compartments},\"degraded_compartments\":{degraded_compartments},\"locker_id\":{quoted_id}}}"
    );

    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// JSON string literal for `s` with non-ASCII and DEL escaped as UTF-16
/// `\uXXXX` units (surrogate pairs above the BMP).
fn ascii_json_string(s: &str) -> String {
    // Value's Display impl handles quotes, backslashes and control characters.
    let quoted = serde_json::Value::String(s.to_owned()).to_string();
    let mut out = String::with_capacity(quoted.len());
    let mut units = [0u16; 2];
    for ch in quoted.chars() {
        if ch.is_ascii() && ch != '\u{7f}' {
            out.push(ch);
            continue;
        }
        for unit in ch.encode_utf16(&mut units).iter() {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
    out
}
