use core::str::FromStr;

use serde::{Deserialize, Serialize};

use lockstream_core::{CompartmentId, DomainError, DomainResult, Entity, LockerId, ReservationId};

/// Reservation lifecycle.
///
/// ```text
/// CREATED ──deposit──▶ DEPOSITED ──pickup──▶ PICKED_UP
///    │                     │
///    └──────expire─────────┴──────────────▶ EXPIRED
/// ```
///
/// `PickedUp` and `Expired` are terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Created,
    Deposited,
    PickedUp,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Deposited => "DEPOSITED",
            Self::PickedUp => "PICKED_UP",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether the reservation still holds its compartment.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Created | Self::Deposited)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl core::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "DEPOSITED" => Ok(Self::Deposited),
            "PICKED_UP" => Ok(Self::PickedUp),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(DomainError::validation(format!(
                "unknown reservation status {other:?}"
            ))),
        }
    }
}

/// A parcel reservation on one compartment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    reservation_id: ReservationId,
    locker_id: LockerId,
    compartment_id: CompartmentId,
    status: ReservationStatus,
}

impl Reservation {
    /// A new reservation in `CREATED`.
    pub fn created(
        reservation_id: ReservationId,
        locker_id: LockerId,
        compartment_id: CompartmentId,
    ) -> Self {
        Self::restore(reservation_id, locker_id, compartment_id, ReservationStatus::Created)
    }

    /// Rehydrate a persisted row (storage adapters only).
    pub fn restore(
        reservation_id: ReservationId,
        locker_id: LockerId,
        compartment_id: CompartmentId,
        status: ReservationStatus,
    ) -> Self {
        Self {
            reservation_id,
            locker_id,
            compartment_id,
            status,
        }
    }

    pub fn reservation_id(&self) -> &ReservationId {
        &self.reservation_id
    }

    pub fn locker_id(&self) -> &LockerId {
        &self.locker_id
    }

    pub fn compartment_id(&self) -> &CompartmentId {
        &self.compartment_id
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// CREATED → DEPOSITED.
    pub fn deposit(&mut self) -> DomainResult<()> {
        if self.status != ReservationStatus::Created {
            return Err(DomainError::rule(format!(
                "cannot deposit parcel for reservation {} in status {}",
                self.reservation_id, self.status
            )));
        }
        self.status = ReservationStatus::Deposited;
        Ok(())
    }

    /// DEPOSITED → PICKED_UP.
    pub fn pick_up(&mut self) -> DomainResult<()> {
        match self.status {
            ReservationStatus::Deposited => {
                self.status = ReservationStatus::PickedUp;
                Ok(())
            }
            ReservationStatus::Expired => Err(DomainError::rule(format!(
                "cannot pick up parcel: reservation {} is expired",
                self.reservation_id
            ))),
            other => Err(DomainError::rule(format!(
                "cannot pick up parcel for reservation {} in status {}",
                self.reservation_id, other
            ))),
        }
    }

    /// Expire an active reservation.
    ///
    /// Returns `true` if the reservation was active and is now `EXPIRED`;
    /// terminal reservations are left untouched and `false` is returned.
    pub fn expire(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = ReservationStatus::Expired;
        true
    }
}

impl Entity for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.reservation_id
    }
}
