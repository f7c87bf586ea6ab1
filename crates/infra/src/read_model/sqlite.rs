//! SQLite-backed read model store.
//!
//! Durable counterpart of `InMemoryReadModelStore` with the same contract.
//! The store exposes a synchronous API: it owns a current-thread tokio
//! runtime and drives sqlx on it with `block_on`. It must therefore not be
//! used from inside another async runtime.
//!
//! ## Atomicity
//!
//! `commit()` applies a change set inside one SQL transaction. Any error
//! returns before `COMMIT`; the transaction is rolled back when dropped.
//!
//! ## Connections
//!
//! The pool holds exactly one long-lived connection. That keeps
//! `sqlite::memory:` databases alive for the lifetime of the store and
//! serialises writers.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::runtime::Runtime;

use lockstream_core::{CompartmentKey, EventId, LockerId, ReservationId};
use lockstream_lockers::{Compartment, Fault, Locker, Reservation, ReservationStatus};

use super::r#trait::{ChangeSet, ReadModelSnapshot, ReadModelStore, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS lockers (
    locker_id             TEXT PRIMARY KEY NOT NULL,
    compartments          INTEGER NOT NULL,
    active_reservations   INTEGER NOT NULL,
    degraded_compartments INTEGER NOT NULL,
    state_hash            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS compartments (
    locker_id             TEXT NOT NULL,
    compartment_id        TEXT NOT NULL,
    degraded              INTEGER NOT NULL,
    faulty                INTEGER NOT NULL,
    active_reservation_id TEXT NULL,
    PRIMARY KEY (locker_id, compartment_id)
);

CREATE TABLE IF NOT EXISTS reservations (
    reservation_id TEXT PRIMARY KEY NOT NULL,
    locker_id      TEXT NOT NULL,
    compartment_id TEXT NOT NULL,
    status         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS faults (
    fault_event_id      TEXT PRIMARY KEY NOT NULL,
    locker_id           TEXT NOT NULL,
    compartment_id      TEXT NOT NULL,
    severity            INTEGER NOT NULL,
    cleared             INTEGER NOT NULL,
    cleared_by_event_id TEXT NULL
);

CREATE INDEX IF NOT EXISTS faults_by_compartment ON faults (locker_id, compartment_id);
"#;

const LOCKER_COLUMNS: &str =
    "locker_id, compartments, active_reservations, degraded_compartments, state_hash";
const COMPARTMENT_COLUMNS: &str =
    "locker_id, compartment_id, degraded, faulty, active_reservation_id";
const RESERVATION_COLUMNS: &str = "reservation_id, locker_id, compartment_id, status";
const FAULT_COLUMNS: &str =
    "fault_event_id, locker_id, compartment_id, severity, cleared, cleared_by_event_id";

pub struct SqliteReadModelStore {
    runtime: Runtime,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteReadModelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteReadModelStore").finish_non_exhaustive()
    }
}

impl SqliteReadModelStore {
    /// Connect to `url` (e.g. `sqlite::memory:` or `sqlite://data/read_model.db`)
    /// and create the schema if needed.
    pub fn connect(url: &str) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Runtime)?;

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = runtime.block_on(
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options),
        )?;

        runtime.block_on(sqlx::raw_sql(SCHEMA).execute(&pool))?;

        tracing::info!(url, "sqlite read model store ready");
        Ok(Self { runtime, pool })
    }

    fn fetch_optional<T>(
        &self,
        sql: &str,
        binds: &[&str],
        decode: fn(&SqliteRow) -> StoreResult<T>,
    ) -> StoreResult<Option<T>> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let row = self.runtime.block_on(query.fetch_optional(&self.pool))?;
        row.as_ref().map(decode).transpose()
    }

    fn fetch_all<T>(
        &self,
        sql: &str,
        binds: &[&str],
        decode: fn(&SqliteRow) -> StoreResult<T>,
    ) -> StoreResult<Vec<T>> {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = self.runtime.block_on(query.fetch_all(&self.pool))?;
        rows.iter().map(decode).collect()
    }
}

impl Drop for SqliteReadModelStore {
    fn drop(&mut self) {
        // Close while the runtime is still alive so pooled connections shut
        // down cleanly (and release file locks).
        self.runtime.block_on(self.pool.close());
    }
}

impl ReadModelStore for SqliteReadModelStore {
    fn get_locker(&self, locker_id: &LockerId) -> StoreResult<Option<Locker>> {
        self.fetch_optional(
            &format!("SELECT {LOCKER_COLUMNS} FROM lockers WHERE locker_id = ?1"),
            &[locker_id.as_str()],
            locker_from_row,
        )
    }

    fn get_compartment(&self, key: &CompartmentKey) -> StoreResult<Option<Compartment>> {
        self.fetch_optional(
            &format!(
                "SELECT {COMPARTMENT_COLUMNS} FROM compartments \
                 WHERE locker_id = ?1 AND compartment_id = ?2"
            ),
            &[key.locker_id.as_str(), key.compartment_id.as_str()],
            compartment_from_row,
        )
    }

    fn get_reservation(&self, reservation_id: &ReservationId) -> StoreResult<Option<Reservation>> {
        self.fetch_optional(
            &format!("SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = ?1"),
            &[reservation_id.as_str()],
            reservation_from_row,
        )
    }

    fn get_fault(&self, fault_event_id: &EventId) -> StoreResult<Option<Fault>> {
        self.fetch_optional(
            &format!("SELECT {FAULT_COLUMNS} FROM faults WHERE fault_event_id = ?1"),
            &[fault_event_id.as_str()],
            fault_from_row,
        )
    }

    fn compartment_faults(&self, key: &CompartmentKey) -> StoreResult<Vec<Fault>> {
        self.fetch_all(
            &format!(
                "SELECT {FAULT_COLUMNS} FROM faults \
                 WHERE locker_id = ?1 AND compartment_id = ?2 ORDER BY fault_event_id"
            ),
            &[key.locker_id.as_str(), key.compartment_id.as_str()],
            fault_from_row,
        )
    }

    fn list_lockers(&self) -> StoreResult<Vec<Locker>> {
        self.fetch_all(
            &format!("SELECT {LOCKER_COLUMNS} FROM lockers ORDER BY locker_id"),
            &[],
            locker_from_row,
        )
    }

    fn snapshot(&self) -> StoreResult<ReadModelSnapshot> {
        Ok(ReadModelSnapshot {
            lockers: self.list_lockers()?,
            compartments: self.fetch_all(
                &format!(
                    "SELECT {COMPARTMENT_COLUMNS} FROM compartments \
                     ORDER BY locker_id, compartment_id"
                ),
                &[],
                compartment_from_row,
            )?,
            reservations: self.fetch_all(
                &format!("SELECT {RESERVATION_COLUMNS} FROM reservations ORDER BY reservation_id"),
                &[],
                reservation_from_row,
            )?,
            faults: self.fetch_all(
                &format!("SELECT {FAULT_COLUMNS} FROM faults ORDER BY fault_event_id"),
                &[],
                fault_from_row,
            )?,
        })
    }

    fn commit(&self, changes: ChangeSet) -> StoreResult<()> {
        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;

            for locker in changes.lockers.values() {
                sqlx::query(
                    r#"
                    INSERT INTO lockers (locker_id, compartments, active_reservations, degraded_compartments, state_hash)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT (locker_id) DO UPDATE SET
                        compartments = excluded.compartments,
                        active_reservations = excluded.active_reservations,
                        degraded_compartments = excluded.degraded_compartments,
                        state_hash = excluded.state_hash
                    "#,
                )
                .bind(locker.locker_id().as_str())
                .bind(to_sql_int("lockers", locker.compartments())?)
                .bind(to_sql_int("lockers", locker.active_reservations())?)
                .bind(to_sql_int("lockers", locker.degraded_compartments())?)
                .bind(locker.state_hash())
                .execute(&mut *tx)
                .await?;
            }

            for compartment in changes.compartments.values() {
                sqlx::query(
                    r#"
                    INSERT INTO compartments (locker_id, compartment_id, degraded, faulty, active_reservation_id)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT (locker_id, compartment_id) DO UPDATE SET
                        degraded = excluded.degraded,
                        faulty = excluded.faulty,
                        active_reservation_id = excluded.active_reservation_id
                    "#,
                )
                .bind(compartment.locker_id().as_str())
                .bind(compartment.compartment_id().as_str())
                .bind(compartment.is_degraded())
                .bind(compartment.is_faulty())
                .bind(compartment.active_reservation_id().map(|r| r.as_str()))
                .execute(&mut *tx)
                .await?;
            }

            for reservation in changes.reservations.values() {
                sqlx::query(
                    r#"
                    INSERT INTO reservations (reservation_id, locker_id, compartment_id, status)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT (reservation_id) DO UPDATE SET
                        locker_id = excluded.locker_id,
                        compartment_id = excluded.compartment_id,
                        status = excluded.status
                    "#,
                )
                .bind(reservation.reservation_id().as_str())
                .bind(reservation.locker_id().as_str())
                .bind(reservation.compartment_id().as_str())
                .bind(reservation.status().as_str())
                .execute(&mut *tx)
                .await?;
            }

            for fault in changes.faults.values() {
                sqlx::query(
                    r#"
                    INSERT INTO faults (fault_event_id, locker_id, compartment_id, severity, cleared, cleared_by_event_id)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT (fault_event_id) DO UPDATE SET
                        cleared = excluded.cleared,
                        cleared_by_event_id = excluded.cleared_by_event_id
                    "#,
                )
                .bind(fault.fault_event_id().as_str())
                .bind(fault.locker_id().as_str())
                .bind(fault.compartment_id().as_str())
                .bind(fault.severity())
                .bind(fault.is_cleared())
                .bind(fault.cleared_by_event_id().map(|e| e.as_str()))
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok::<_, StoreError>(())
        })
    }

    fn reset(&self) -> StoreResult<()> {
        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;
            for table in ["lockers", "compartments", "reservations", "faults"] {
                sqlx::query(&format!("DELETE FROM {table}"))
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok::<_, StoreError>(())
        })?;
        tracing::debug!("sqlite read model reset");
        Ok(())
    }
}

fn to_sql_int(table: &'static str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Encode {
        table,
        reason: format!("counter {value} exceeds the INTEGER range"),
    })
}

fn counter(row: &SqliteRow, table: &'static str, column: &str) -> StoreResult<u64> {
    let value: i64 = row.try_get(column)?;
    u64::try_from(value).map_err(|_| StoreError::Decode {
        table,
        reason: format!("{column} is negative ({value})"),
    })
}

fn locker_from_row(row: &SqliteRow) -> StoreResult<Locker> {
    Ok(Locker::restore(
        LockerId::new(row.try_get::<String, _>("locker_id")?),
        counter(row, "lockers", "compartments")?,
        counter(row, "lockers", "active_reservations")?,
        counter(row, "lockers", "degraded_compartments")?,
        row.try_get("state_hash")?,
    ))
}

fn compartment_from_row(row: &SqliteRow) -> StoreResult<Compartment> {
    let active: Option<String> = row.try_get("active_reservation_id")?;
    Ok(Compartment::restore(
        CompartmentKey::new(
            LockerId::new(row.try_get::<String, _>("locker_id")?),
            row.try_get::<String, _>("compartment_id")?.as_str().into(),
        ),
        row.try_get("degraded")?,
        row.try_get("faulty")?,
        active.map(ReservationId::new),
    ))
}

fn reservation_from_row(row: &SqliteRow) -> StoreResult<Reservation> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ReservationStatus>()
        .map_err(|e| StoreError::Decode {
            table: "reservations",
            reason: e.to_string(),
        })?;
    Ok(Reservation::restore(
        ReservationId::new(row.try_get::<String, _>("reservation_id")?),
        LockerId::new(row.try_get::<String, _>("locker_id")?),
        row.try_get::<String, _>("compartment_id")?.as_str().into(),
        status,
    ))
}

fn fault_from_row(row: &SqliteRow) -> StoreResult<Fault> {
    let cleared: bool = row.try_get("cleared")?;
    let cleared_by: Option<String> = row.try_get("cleared_by_event_id")?;
    if cleared != cleared_by.is_some() {
        return Err(StoreError::Decode {
            table: "faults",
            reason: "cleared flag disagrees with cleared_by_event_id".to_string(),
        });
    }
    Ok(Fault::restore(
        EventId::new(row.try_get::<String, _>("fault_event_id")?),
        LockerId::new(row.try_get::<String, _>("locker_id")?),
        row.try_get::<String, _>("compartment_id")?.as_str().into(),
        row.try_get("severity")?,
        cleared_by.map(EventId::new),
    ))
}
