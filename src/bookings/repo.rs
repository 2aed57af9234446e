use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{Booking, BookingRow, BookingStatus, NewBooking};

#[async_trait]
pub trait BookingRepo: Send + Sync {
    async fn insert(&self, booking: NewBooking) -> anyhow::Result<Booking>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Booking>>;
    /// Newest first.
    async fn list(&self) -> anyhow::Result<Vec<Booking>>;
    /// Newest first.
    async fn list_by_customer(&self, customer: Uuid) -> anyhow::Result<Vec<Booking>>;
    /// Writes the editable fields and the status, but only while the stored
    /// status is still `expected`. Completing is refused while a cancel
    /// request is pending. `cancel_request` is never written here.
    /// `None` when no row matched.
    async fn save(&self, booking: &Booking, expected: BookingStatus)
        -> anyhow::Result<Option<Booking>>;
    /// Raises the cancel flag if the booking is open and has no request
    /// pending. `None` when no row matched.
    async fn flag_cancel_request(&self, id: Uuid) -> anyhow::Result<Option<Booking>>;
    /// Clears a pending cancel request; `approve` also cancels the booking.
    /// `None` when no request was pending.
    async fn resolve_cancel_request(&self, id: Uuid, approve: bool)
        -> anyhow::Result<Option<Booking>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgBookingRepo {
    db: PgPool,
}

impl PgBookingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingRepo for PgBookingRepo {
    async fn insert(&self, booking: NewBooking) -> anyhow::Result<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (id, customer_id, event, place, phone, date, guests, items, service_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                      status, cancel_request, service_type, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.customer)
        .bind(&booking.event)
        .bind(&booking.place)
        .bind(&booking.phone)
        .bind(booking.date)
        .bind(booking.guests)
        .bind(Json(&booking.items))
        .bind(booking.service_type)
        .fetch_one(&self.db)
        .await
        .context("insert booking")?;
        Ok(row.into())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                   status, cancel_request, service_type, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find booking")?;
        Ok(row.map(Booking::from))
    }

    async fn list(&self) -> anyhow::Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                   status, cancel_request, service_type, created_at, updated_at
            FROM bookings
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list bookings")?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_by_customer(&self, customer: Uuid) -> anyhow::Result<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                   status, cancel_request, service_type, created_at, updated_at
            FROM bookings
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer)
        .fetch_all(&self.db)
        .await
        .context("list bookings by customer")?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn save(
        &self,
        booking: &Booking,
        expected: BookingStatus,
    ) -> anyhow::Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
               SET event = $2, place = $3, phone = $4, date = $5, guests = $6, items = $7,
                   assigned_staff = $8, status = $9, service_type = $10,
                   updated_at = now()
             WHERE id = $1
               AND status = $11
               AND NOT ($9 = 'completed'::booking_status AND cancel_request)
            RETURNING id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                      status, cancel_request, service_type, created_at, updated_at
            "#,
        )
        .bind(booking.id)
        .bind(&booking.event)
        .bind(&booking.place)
        .bind(&booking.phone)
        .bind(booking.date)
        .bind(booking.guests)
        .bind(Json(&booking.items))
        .bind(&booking.assigned_staff)
        .bind(booking.status)
        .bind(booking.service_type)
        .bind(expected)
        .fetch_optional(&self.db)
        .await
        .context("save booking")?;
        Ok(row.map(Booking::from))
    }

    async fn flag_cancel_request(&self, id: Uuid) -> anyhow::Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
               SET cancel_request = TRUE, updated_at = now()
             WHERE id = $1
               AND NOT cancel_request
               AND status NOT IN ('cancelled', 'completed')
            RETURNING id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                      status, cancel_request, service_type, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("flag cancel request")?;
        Ok(row.map(Booking::from))
    }

    async fn resolve_cancel_request(
        &self,
        id: Uuid,
        approve: bool,
    ) -> anyhow::Result<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings
               SET status = CASE WHEN $2 THEN 'cancelled'::booking_status ELSE status END,
                   cancel_request = FALSE,
                   updated_at = now()
             WHERE id = $1 AND cancel_request
            RETURNING id, customer_id, event, place, phone, date, guests, items, assigned_staff,
                      status, cancel_request, service_type, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(approve)
        .fetch_optional(&self.db)
        .await
        .context("resolve cancel request")?;
        Ok(row.map(Booking::from))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete booking")?;
        Ok(res.rows_affected() > 0)
    }
}
