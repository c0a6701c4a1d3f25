//! [`SqliteStore`] — the SQLite implementation of [`StudioStore`].
//!
//! The booking lifecycle methods each run inside one transaction, so the
//! capacity check, duplicate check, subscription selection, insert, and
//! visit debit observe a single snapshot. The visit debit itself is a
//! guarded conditional update (`visits_remaining > 0`) rather than a
//! read-then-write, and the credit-back is clamped to `visits_total`.

use std::path::Path;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use prana_core::{
  aggregator::{AggregatorVisit, NewAggregatorVisit},
  booking::{Booking, BookingReceipt, BookingStatus},
  news::{NewPost, NewsPost},
  policy::Actor,
  profile::{ClientProfile, ClientUpdate, LeadStatus, NewClient, Role, StoredCredentials},
  schedule::{ClassSession, ClassType, Coach, NewClassType, NewCoach, NewSession, SessionCard, SessionOccupancy},
  settings::{self, StudioSetting, CANCELLATION_MINUTES_KEY},
  store::StudioStore,
  subscription::{NewPlan, NewSubscription, Subscription, SubscriptionPlan, SubscriptionUpdate},
};

use crate::{
  encode::{
    decode_dt, encode_booking_status, encode_date, encode_dt, encode_lead_status,
    encode_role, encode_uuid, RawBooking, RawClassType, RawCoach, RawNews,
    RawPlan, RawProfile, RawSession, RawSubscription, RawVisit,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Row mappers ─────────────────────────────────────────────────────────────

const PROFILE_COLS: &str =
  "profile_id, first_name, last_name, phone, email, role, lead_status, balance, notes, created_at";

fn read_profile(row: &rusqlite::Row) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    profile_id:  row.get(0)?,
    first_name:  row.get(1)?,
    last_name:   row.get(2)?,
    phone:       row.get(3)?,
    email:       row.get(4)?,
    role:        row.get(5)?,
    lead_status: row.get(6)?,
    balance:     row.get(7)?,
    notes:       row.get(8)?,
    created_at:  row.get(9)?,
  })
}

const SESSION_COLS: &str =
  "session_id, class_type_id, coach_id, start_time, end_time, capacity";

fn read_session(row: &rusqlite::Row) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    session_id:    row.get(0)?,
    class_type_id: row.get(1)?,
    coach_id:      row.get(2)?,
    start_time:    row.get(3)?,
    end_time:      row.get(4)?,
    capacity:      row.get(5)?,
  })
}

const BOOKING_COLS: &str =
  "booking_id, session_id, client_id, subscription_id, status, created_at";

fn read_booking(row: &rusqlite::Row) -> rusqlite::Result<RawBooking> {
  Ok(RawBooking {
    booking_id:      row.get(0)?,
    session_id:      row.get(1)?,
    client_id:       row.get(2)?,
    subscription_id: row.get(3)?,
    status:          row.get(4)?,
    created_at:      row.get(5)?,
  })
}

const SUBSCRIPTION_COLS: &str =
  "subscription_id, client_id, plan_id, visits_total, visits_remaining, activation_date, end_date, is_active";

fn read_subscription(row: &rusqlite::Row) -> rusqlite::Result<RawSubscription> {
  Ok(RawSubscription {
    subscription_id:  row.get(0)?,
    client_id:        row.get(1)?,
    plan_id:          row.get(2)?,
    visits_total:     row.get(3)?,
    visits_remaining: row.get(4)?,
    activation_date:  row.get(5)?,
    end_date:         row.get(6)?,
    is_active:        row.get(7)?,
  })
}

// ─── Lifecycle outcomes ──────────────────────────────────────────────────────

// Domain decisions made inside a transaction closure are carried out as plain
// values; the closure's error channel stays reserved for SQLite failures.

enum BookOutcome {
  Booked { booking: RawBooking, subscription: RawSubscription },
  SessionMissing,
  ClientMissing,
  Full,
  Duplicate,
  NoSubscription,
  Exhausted(String),
}

enum StatusOutcome {
  Updated(RawBooking),
  Missing,
  AlreadyCancelled,
  WindowBlocked { minutes_left: i64, window_minutes: i64 },
  CorruptTimestamp(String),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Prana studio store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_profile_raw(&self, id: Uuid) -> Result<Option<RawProfile>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLS} FROM profiles WHERE profile_id = ?1"),
              rusqlite::params![id_str],
              read_profile,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }
}

// ─── StudioStore impl ────────────────────────────────────────────────────────

impl StudioStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn add_client(&self, input: NewClient) -> Result<ClientProfile> {
    input.validate().map_err(Error::Core)?;

    let profile = ClientProfile {
      profile_id:  Uuid::new_v4(),
      first_name:  input.first_name,
      last_name:   input.last_name,
      phone:       input.phone,
      email:       input.email,
      role:        input.role,
      lead_status: input.lead_status,
      balance:     0,
      notes:       input.notes,
      created_at:  Utc::now(),
    };

    let id_str     = encode_uuid(profile.profile_id);
    let at_str     = encode_dt(profile.created_at);
    let role_str   = encode_role(profile.role).to_owned();
    let status_str = encode_lead_status(profile.lead_status).to_owned();
    let p          = profile.clone();
    let hash       = input.password_hash;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             profile_id, first_name, last_name, phone, email,
             role, lead_status, balance, notes, password_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            id_str,
            p.first_name,
            p.last_name,
            p.phone,
            p.email,
            role_str,
            status_str,
            p.balance,
            p.notes,
            hash,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_client(&self, id: Uuid) -> Result<Option<ClientProfile>> {
    self
      .get_profile_raw(id)
      .await?
      .map(RawProfile::into_profile)
      .transpose()
  }

  async fn list_clients(
    &self,
    lead_status: Option<LeadStatus>,
  ) -> Result<Vec<ClientProfile>> {
    let status_str = lead_status.map(encode_lead_status).map(str::to_owned);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLS} FROM profiles
             WHERE role = 'client' AND lead_status = ?1
             ORDER BY first_name"
          ))?;
          stmt
            .query_map(rusqlite::params![s], read_profile)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLS} FROM profiles
             WHERE role = 'client'
             ORDER BY first_name"
          ))?;
          stmt
            .query_map([], read_profile)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn list_users(&self) -> Result<Vec<ClientProfile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLS} FROM profiles ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], read_profile)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn update_client(&self, id: Uuid, update: ClientUpdate) -> Result<ClientProfile> {
    let current = self
      .get_client(id)
      .await?
      .ok_or(Error::Core(prana_core::Error::ClientNotFound(id)))?;

    let next = ClientProfile {
      first_name: update.first_name.unwrap_or(current.first_name),
      last_name:  update.last_name.or(current.last_name),
      phone:      update.phone.unwrap_or(current.phone),
      email:      update.email.or(current.email),
      balance:    update.balance.unwrap_or(current.balance),
      notes:      update.notes.or(current.notes),
      ..current
    };

    let id_str = encode_uuid(id);
    let n      = next.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE profiles
           SET first_name = ?2, last_name = ?3, phone = ?4, email = ?5,
               balance = ?6, notes = ?7
           WHERE profile_id = ?1",
          rusqlite::params![
            id_str, n.first_name, n.last_name, n.phone, n.email, n.balance, n.notes
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(next)
  }

  async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> Result<ClientProfile> {
    let id_str     = encode_uuid(id);
    let status_str = encode_lead_status(status).to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET lead_status = ?2 WHERE profile_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(prana_core::Error::ClientNotFound(id)));
    }
    self
      .get_client(id)
      .await?
      .ok_or(Error::Core(prana_core::Error::ClientNotFound(id)))
  }

  async fn credentials_for(&self, phone: &str) -> Result<Option<StoredCredentials>> {
    let phone = phone.to_owned();

    let raw: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT profile_id, role, password_hash FROM profiles
               WHERE phone = ?1 AND password_hash IS NOT NULL",
              rusqlite::params![phone],
              |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, role, hash)| {
        Ok(StoredCredentials {
          profile_id:    crate::encode::decode_uuid(&id)?,
          role:          crate::encode::decode_role(&role)?,
          password_hash: hash,
        })
      })
      .transpose()
  }

  // ── Coaches ───────────────────────────────────────────────────────────────

  async fn add_coach(&self, input: NewCoach) -> Result<Coach> {
    let coach = Coach {
      coach_id: Uuid::new_v4(),
      name:     input.name,
      bio:      input.bio,
      phone:    input.phone,
    };

    let id_str = encode_uuid(coach.coach_id);
    let c      = coach.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO coaches (coach_id, name, bio, phone) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, c.name, c.bio, c.phone],
        )?;
        Ok(())
      })
      .await?;

    Ok(coach)
  }

  async fn list_coaches(&self) -> Result<Vec<Coach>> {
    let raws: Vec<RawCoach> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT coach_id, name, bio, phone FROM coaches ORDER BY name")?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawCoach {
              coach_id: r.get(0)?,
              name:     r.get(1)?,
              bio:      r.get(2)?,
              phone:    r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCoach::into_coach).collect()
  }

  async fn remove_coach(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM coaches WHERE coach_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Class types ───────────────────────────────────────────────────────────

  async fn add_class_type(&self, input: NewClassType) -> Result<ClassType> {
    let class_type = ClassType {
      class_type_id: Uuid::new_v4(),
      name:          input.name,
      color:         input.color,
      description:   input.description,
    };

    let id_str = encode_uuid(class_type.class_type_id);
    let ct     = class_type.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO class_types (class_type_id, name, color, description)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, ct.name, ct.color, ct.description],
        )?;
        Ok(())
      })
      .await?;

    Ok(class_type)
  }

  async fn list_class_types(&self) -> Result<Vec<ClassType>> {
    let raws: Vec<RawClassType> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT class_type_id, name, color, description FROM class_types ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawClassType {
              class_type_id: r.get(0)?,
              name:          r.get(1)?,
              color:         r.get(2)?,
              description:   r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClassType::into_class_type).collect()
  }

  async fn remove_class_type(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM class_types WHERE class_type_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn add_session(&self, input: NewSession) -> Result<ClassSession> {
    input.validate().map_err(Error::Core)?;

    let session = ClassSession {
      session_id:    Uuid::new_v4(),
      class_type_id: input.class_type_id,
      coach_id:      input.coach_id,
      start_time:    input.start_time,
      end_time:      input.end_time,
      capacity:      input.capacity,
    };

    let id_str    = encode_uuid(session.session_id);
    let ct_str    = encode_uuid(session.class_type_id);
    let coach_str = encode_uuid(session.coach_id);
    let start_str = encode_dt(session.start_time);
    let end_str   = encode_dt(session.end_time);
    let capacity  = session.capacity as i64;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, class_type_id, coach_id, start_time, end_time, capacity)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, ct_str, coach_str, start_str, end_str, capacity],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<ClassSession>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SESSION_COLS} FROM sessions WHERE session_id = ?1"),
              rusqlite::params![id_str],
              read_session,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn list_sessions(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> Result<Vec<SessionCard>> {
    let from_str = encode_dt(from);
    let to_str   = encode_dt(to);

    let raws: Vec<(RawSession, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SESSION_COLS},
                  (SELECT COUNT(*) FROM bookings b
                    WHERE b.session_id = sessions.session_id
                      AND b.status != 'cancelled') AS booked
           FROM sessions
           WHERE start_time >= ?1 AND start_time <= ?2
           ORDER BY start_time"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![from_str, to_str], |r| {
            Ok((read_session(r)?, r.get::<_, i64>(6)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, booked)| {
        let session = raw.into_session()?;
        let occupancy = SessionOccupancy {
          session_id: session.session_id,
          capacity:   session.capacity,
          booked:     booked as u32,
        };
        Ok(SessionCard { session, occupancy })
      })
      .collect()
  }

  async fn update_session(&self, id: Uuid, input: NewSession) -> Result<ClassSession> {
    input.validate().map_err(Error::Core)?;

    let session = ClassSession {
      session_id:    id,
      class_type_id: input.class_type_id,
      coach_id:      input.coach_id,
      start_time:    input.start_time,
      end_time:      input.end_time,
      capacity:      input.capacity,
    };

    let id_str    = encode_uuid(id);
    let ct_str    = encode_uuid(session.class_type_id);
    let coach_str = encode_uuid(session.coach_id);
    let start_str = encode_dt(session.start_time);
    let end_str   = encode_dt(session.end_time);
    let capacity  = session.capacity as i64;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sessions
           SET class_type_id = ?2, coach_id = ?3, start_time = ?4, end_time = ?5, capacity = ?6
           WHERE session_id = ?1",
          rusqlite::params![id_str, ct_str, coach_str, start_str, end_str, capacity],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::Core(prana_core::Error::SessionNotFound(id)));
    }
    Ok(session)
  }

  async fn remove_session(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE session_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_occupancy(&self, id: Uuid) -> Result<SessionOccupancy> {
    let id_str = encode_uuid(id);

    let row: Option<(i64, i64)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT capacity,
                      (SELECT COUNT(*) FROM bookings b
                        WHERE b.session_id = sessions.session_id
                          AND b.status != 'cancelled')
               FROM sessions WHERE session_id = ?1",
              rusqlite::params![id_str],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let (capacity, booked) =
      row.ok_or(Error::Core(prana_core::Error::SessionNotFound(id)))?;

    Ok(SessionOccupancy {
      session_id: id,
      capacity:   capacity as u32,
      booked:     booked as u32,
    })
  }

  // ── Booking lifecycle ─────────────────────────────────────────────────────

  async fn book_session(
    &self,
    session_id: Uuid,
    client_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<BookingReceipt> {
    let sid_str    = encode_uuid(session_id);
    let cid_str    = encode_uuid(client_id);
    let bid_str    = encode_uuid(Uuid::new_v4());
    let now_str    = encode_dt(now);
    let today_str  = encode_date(now.date_naive());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let capacity: Option<i64> = tx
          .query_row(
            "SELECT capacity FROM sessions WHERE session_id = ?1",
            rusqlite::params![sid_str],
            |r| r.get(0),
          )
          .optional()?;
        let capacity = match capacity {
          Some(c) => c,
          None => return Ok(BookOutcome::SessionMissing),
        };

        let client_exists: bool = tx
          .query_row(
            "SELECT 1 FROM profiles WHERE profile_id = ?1",
            rusqlite::params![cid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !client_exists {
          return Ok(BookOutcome::ClientMissing);
        }

        let booked: i64 = tx.query_row(
          "SELECT COUNT(*) FROM bookings
           WHERE session_id = ?1 AND status != 'cancelled'",
          rusqlite::params![sid_str],
          |r| r.get(0),
        )?;
        if booked >= capacity {
          return Ok(BookOutcome::Full);
        }

        let duplicate: bool = tx
          .query_row(
            "SELECT 1 FROM bookings
             WHERE session_id = ?1 AND client_id = ?2 AND status != 'cancelled'",
            rusqlite::params![sid_str, cid_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if duplicate {
          return Ok(BookOutcome::Duplicate);
        }

        // Consume the subscription expiring soonest.
        let sub: Option<RawSubscription> = tx
          .query_row(
            &format!(
              "SELECT {SUBSCRIPTION_COLS} FROM subscriptions
               WHERE client_id = ?1 AND is_active = 1 AND end_date >= ?2
                 AND (visits_total IS NULL OR visits_remaining > 0)
               ORDER BY end_date ASC LIMIT 1"
            ),
            rusqlite::params![cid_str, today_str],
            read_subscription,
          )
          .optional()?;
        let sub = match sub {
          Some(s) => s,
          None => return Ok(BookOutcome::NoSubscription),
        };

        tx.execute(
          "INSERT INTO bookings (booking_id, session_id, client_id, subscription_id, status, created_at)
           VALUES (?1, ?2, ?3, ?4, 'booked', ?5)",
          rusqlite::params![bid_str, sid_str, cid_str, sub.subscription_id, now_str],
        )?;

        // Guarded debit; unlimited plans are never touched.
        if sub.visits_total.is_some() {
          let debited = tx.execute(
            "UPDATE subscriptions SET visits_remaining = visits_remaining - 1
             WHERE subscription_id = ?1 AND visits_remaining > 0",
            rusqlite::params![sub.subscription_id],
          )?;
          if debited == 0 {
            // Rolls back the insert when the transaction is dropped.
            return Ok(BookOutcome::Exhausted(sub.subscription_id));
          }
        }

        let sub_after: RawSubscription = tx.query_row(
          &format!(
            "SELECT {SUBSCRIPTION_COLS} FROM subscriptions WHERE subscription_id = ?1"
          ),
          rusqlite::params![sub.subscription_id],
          read_subscription,
        )?;

        let booking = RawBooking {
          booking_id:      bid_str.clone(),
          session_id:      sid_str.clone(),
          client_id:       cid_str.clone(),
          subscription_id: Some(sub.subscription_id.clone()),
          status:          "booked".to_owned(),
          created_at:      now_str.clone(),
        };

        tx.commit()?;
        Ok(BookOutcome::Booked { booking, subscription: sub_after })
      })
      .await?;

    match outcome {
      BookOutcome::Booked { booking, subscription } => Ok(BookingReceipt {
        booking:      booking.into_booking()?,
        subscription: subscription.into_subscription()?,
      }),
      BookOutcome::SessionMissing => {
        Err(Error::Core(prana_core::Error::SessionNotFound(session_id)))
      }
      BookOutcome::ClientMissing => {
        Err(Error::Core(prana_core::Error::ClientNotFound(client_id)))
      }
      BookOutcome::Full => Err(Error::Core(prana_core::Error::SessionFull(session_id))),
      BookOutcome::Duplicate => Err(Error::Core(
        prana_core::Error::DuplicateBooking { session_id, client_id },
      )),
      BookOutcome::NoSubscription => {
        Err(Error::Core(prana_core::Error::NoActiveSubscription(client_id)))
      }
      BookOutcome::Exhausted(sub_id) => Err(Error::Core(
        prana_core::Error::VisitsExhausted(crate::encode::decode_uuid(&sub_id)?),
      )),
    }
  }

  async fn cancel_booking(
    &self,
    booking_id: Uuid,
    actor: Actor,
    now: DateTime<Utc>,
  ) -> Result<Booking> {
    self
      .set_booking_status(booking_id, BookingStatus::Cancelled, actor, now)
      .await
  }

  async fn set_booking_status(
    &self,
    booking_id: Uuid,
    status: BookingStatus,
    actor: Actor,
    now: DateTime<Utc>,
  ) -> Result<Booking> {
    let bid_str    = encode_uuid(booking_id);
    let status_str = encode_booking_status(status).to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(RawBooking, String)> = tx
          .query_row(
            "SELECT b.booking_id, b.session_id, b.client_id, b.subscription_id,
                    b.status, b.created_at, s.start_time
             FROM bookings b
             JOIN sessions s ON s.session_id = b.session_id
             WHERE b.booking_id = ?1",
            rusqlite::params![bid_str],
            |r| Ok((read_booking(r)?, r.get::<_, String>(6)?)),
          )
          .optional()?;
        let (mut raw, start_str) = match row {
          Some(v) => v,
          None => return Ok(StatusOutcome::Missing),
        };

        // Cancelled is terminal. Reviving a booking would have to re-run
        // the capacity, duplicate, and debit checks; a fresh booking does.
        if raw.status == "cancelled" {
          return Ok(StatusOutcome::AlreadyCancelled);
        }
        let entering_cancelled = status_str == "cancelled";

        if entering_cancelled {
          let window_raw: Option<String> = tx
            .query_row(
              "SELECT value FROM studio_settings WHERE key = ?1",
              rusqlite::params![CANCELLATION_MINUTES_KEY],
              |r| r.get(0),
            )
            .optional()?;
          let policy = settings::cancellation_policy(window_raw.as_deref());

          let start = match decode_dt(&start_str) {
            Ok(dt) => dt,
            Err(e) => return Ok(StatusOutcome::CorruptTimestamp(e.to_string())),
          };

          if let Err(prana_core::Error::CancellationWindowViolation {
            minutes_left,
            window_minutes,
          }) = policy.authorize(start, now, actor)
          {
            return Ok(StatusOutcome::WindowBlocked { minutes_left, window_minutes });
          }
        }

        tx.execute(
          "UPDATE bookings SET status = ?2 WHERE booking_id = ?1",
          rusqlite::params![bid_str, status_str],
        )?;

        // Credit the visit back exactly once, clamped to the plan total.
        if entering_cancelled {
          if let Some(sub_id) = raw.subscription_id.clone() {
            tx.execute(
              "UPDATE subscriptions
               SET visits_remaining = MIN(visits_total, visits_remaining + 1)
               WHERE subscription_id = ?1 AND visits_total IS NOT NULL",
              rusqlite::params![sub_id],
            )?;
          }
        }

        tx.commit()?;
        raw.status = status_str.clone();
        Ok(StatusOutcome::Updated(raw))
      })
      .await?;

    match outcome {
      StatusOutcome::Updated(raw) => Ok(raw.into_booking()?),
      StatusOutcome::Missing => {
        Err(Error::Core(prana_core::Error::BookingNotFound(booking_id)))
      }
      StatusOutcome::AlreadyCancelled => {
        Err(Error::Core(prana_core::Error::AlreadyCancelled(booking_id)))
      }
      StatusOutcome::WindowBlocked { minutes_left, window_minutes } => {
        Err(Error::Core(prana_core::Error::CancellationWindowViolation {
          minutes_left,
          window_minutes,
        }))
      }
      StatusOutcome::CorruptTimestamp(msg) => Err(Error::Parse(msg)),
    }
  }

  async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawBooking> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {BOOKING_COLS} FROM bookings WHERE booking_id = ?1"),
              rusqlite::params![id_str],
              read_booking,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawBooking::into_booking).transpose()
  }

  async fn list_session_bookings(&self, session_id: Uuid) -> Result<Vec<Booking>> {
    let id_str = encode_uuid(session_id);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOKING_COLS} FROM bookings
           WHERE session_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_booking)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn list_client_bookings(&self, client_id: Uuid) -> Result<Vec<Booking>> {
    let id_str = encode_uuid(client_id);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOKING_COLS} FROM bookings
           WHERE client_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_booking)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  // ── Plans and subscriptions ───────────────────────────────────────────────

  async fn add_plan(&self, input: NewPlan) -> Result<SubscriptionPlan> {
    input.validate().map_err(Error::Core)?;

    let plan = SubscriptionPlan {
      plan_id:       Uuid::new_v4(),
      name:          input.name,
      visits_total:  input.visits_total,
      duration_days: input.duration_days,
      price:         input.price,
    };

    let id_str   = encode_uuid(plan.plan_id);
    let p        = plan.clone();
    let visits   = p.visits_total.map(|v| v as i64);
    let duration = p.duration_days as i64;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plans (plan_id, name, visits_total, duration_days, price)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, p.name, visits, duration, p.price],
        )?;
        Ok(())
      })
      .await?;

    Ok(plan)
  }

  async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
    let raws: Vec<RawPlan> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT plan_id, name, visits_total, duration_days, price
           FROM plans ORDER BY price",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawPlan {
              plan_id:       r.get(0)?,
              name:          r.get(1)?,
              visits_total:  r.get(2)?,
              duration_days: r.get(3)?,
              price:         r.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  async fn remove_plan(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM plans WHERE plan_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn grant_subscription(&self, input: NewSubscription) -> Result<Subscription> {
    let plan_str = encode_uuid(input.plan_id);

    let plan: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT plan_id, name, visits_total, duration_days, price
               FROM plans WHERE plan_id = ?1",
              rusqlite::params![plan_str],
              |r| {
                Ok(RawPlan {
                  plan_id:       r.get(0)?,
                  name:          r.get(1)?,
                  visits_total:  r.get(2)?,
                  duration_days: r.get(3)?,
                  price:         r.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    let plan = plan
      .ok_or(Error::Core(prana_core::Error::PlanNotFound(input.plan_id)))?
      .into_plan()?;

    let end_date = input
      .activation_date
      .checked_add_days(Days::new(plan.duration_days as u64))
      .ok_or_else(|| Error::Parse("end_date out of range".into()))?;

    let subscription = Subscription {
      subscription_id:  Uuid::new_v4(),
      client_id:        input.client_id,
      plan_id:          input.plan_id,
      visits_total:     plan.visits_total,
      visits_remaining: plan.visits_total,
      activation_date:  input.activation_date,
      end_date,
      is_active:        true,
    };

    let id_str     = encode_uuid(subscription.subscription_id);
    let cid_str    = encode_uuid(subscription.client_id);
    let pid_str    = encode_uuid(subscription.plan_id);
    let visits     = subscription.visits_total.map(|v| v as i64);
    let act_str    = encode_date(subscription.activation_date);
    let end_str    = encode_date(subscription.end_date);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subscriptions (
             subscription_id, client_id, plan_id, visits_total, visits_remaining,
             activation_date, end_date, is_active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
          rusqlite::params![id_str, cid_str, pid_str, visits, visits, act_str, end_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(subscription)
  }

  async fn get_subscription(&self, id: Uuid) -> Result<Option<Subscription>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBSCRIPTION_COLS} FROM subscriptions WHERE subscription_id = ?1"
              ),
              rusqlite::params![id_str],
              read_subscription,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  async fn list_client_subscriptions(&self, client_id: Uuid) -> Result<Vec<Subscription>> {
    let id_str = encode_uuid(client_id);

    let raws: Vec<RawSubscription> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBSCRIPTION_COLS} FROM subscriptions
           WHERE client_id = ?1 ORDER BY end_date"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], read_subscription)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubscription::into_subscription).collect()
  }

  async fn update_subscription(
    &self,
    id: Uuid,
    update: SubscriptionUpdate,
  ) -> Result<Subscription> {
    let current = self
      .get_subscription(id)
      .await?
      .ok_or(Error::Core(prana_core::Error::SubscriptionNotFound(id)))?;

    // Clamp staff edits into the ledger invariant.
    let visits_remaining = match (update.visits_remaining, current.visits_total) {
      (Some(v), Some(total)) => Some(v.min(total)),
      (Some(_), None) => None, // unlimited plans have no counter to edit
      (None, _) => current.visits_remaining,
    };

    let next = Subscription {
      visits_remaining,
      end_date:  update.end_date.unwrap_or(current.end_date),
      is_active: update.is_active.unwrap_or(current.is_active),
      ..current
    };

    let id_str  = encode_uuid(id);
    let visits  = next.visits_remaining.map(|v| v as i64);
    let end_str = encode_date(next.end_date);
    let active  = next.is_active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subscriptions
           SET visits_remaining = ?2, end_date = ?3, is_active = ?4
           WHERE subscription_id = ?1",
          rusqlite::params![id_str, visits, end_str, active],
        )?;
        Ok(())
      })
      .await?;

    Ok(next)
  }

  async fn active_subscription(
    &self,
    client_id: Uuid,
    as_of: NaiveDate,
  ) -> Result<Option<Subscription>> {
    let cid_str  = encode_uuid(client_id);
    let date_str = encode_date(as_of);

    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUBSCRIPTION_COLS} FROM subscriptions
                 WHERE client_id = ?1 AND is_active = 1 AND end_date >= ?2
                   AND (visits_total IS NULL OR visits_remaining > 0)
                 ORDER BY end_date ASC LIMIT 1"
              ),
              rusqlite::params![cid_str, date_str],
              read_subscription,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_setting(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM studio_settings WHERE key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
    let key   = key.to_owned();
    let value = value.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO studio_settings (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_settings(&self) -> Result<Vec<StudioSetting>> {
    let settings = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT key, value FROM studio_settings ORDER BY key")?;
        let rows = stmt
          .query_map([], |r| {
            Ok(StudioSetting { key: r.get(0)?, value: r.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(settings)
  }

  // ── News ──────────────────────────────────────────────────────────────────

  async fn publish_news(&self, input: NewPost) -> Result<NewsPost> {
    let post = NewsPost {
      post_id:      Uuid::new_v4(),
      title:        input.title,
      body:         input.body,
      published_at: Utc::now(),
    };

    let id_str = encode_uuid(post.post_id);
    let at_str = encode_dt(post.published_at);
    let p      = post.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO news (post_id, title, body, published_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, p.title, p.body, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(post)
  }

  async fn list_news(&self) -> Result<Vec<NewsPost>> {
    let raws: Vec<RawNews> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT post_id, title, body, published_at FROM news ORDER BY published_at DESC",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawNews {
              post_id:      r.get(0)?,
              title:        r.get(1)?,
              body:         r.get(2)?,
              published_at: r.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNews::into_post).collect()
  }

  async fn remove_news(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM news WHERE post_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Aggregator visits ─────────────────────────────────────────────────────

  async fn add_aggregator_visit(
    &self,
    input: NewAggregatorVisit,
  ) -> Result<AggregatorVisit> {
    let visit = AggregatorVisit {
      visit_id:        Uuid::new_v4(),
      aggregator_name: input.aggregator_name,
      client_name:     input.client_name,
      price:           input.price,
      notes:           input.notes,
      website_url:     input.website_url,
      created_at:      Utc::now(),
    };

    let id_str = encode_uuid(visit.visit_id);
    let at_str = encode_dt(visit.created_at);
    let v      = visit.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO aggregator_visits (
             visit_id, aggregator_name, client_name, price, notes, website_url, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, v.aggregator_name, v.client_name, v.price, v.notes, v.website_url, at_str
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(visit)
  }

  async fn list_aggregator_visits(&self) -> Result<Vec<AggregatorVisit>> {
    let raws: Vec<RawVisit> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT visit_id, aggregator_name, client_name, price, notes, website_url, created_at
           FROM aggregator_visits ORDER BY created_at DESC",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawVisit {
              visit_id:        r.get(0)?,
              aggregator_name: r.get(1)?,
              client_name:     r.get(2)?,
              price:           r.get(3)?,
              notes:           r.get(4)?,
              website_url:     r.get(5)?,
              created_at:      r.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisit::into_visit).collect()
  }

  async fn remove_aggregator_visit(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM aggregator_visits WHERE visit_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
