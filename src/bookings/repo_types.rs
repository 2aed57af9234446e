use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::validation::iso_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// `completed` and `cancelled` admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    #[default]
    Rent,
    Service,
    Event,
    Other,
}

/// A booked line item: equipment, a menu entry and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub customer: Uuid,
    pub event: String,
    pub place: String,
    pub phone: Option<String>,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub guests: i32,
    pub items: Vec<BookingItem>,
    pub assigned_staff: Vec<Uuid>,
    pub status: BookingStatus,
    pub cancel_request: bool,
    pub service_type: ServiceType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub event: String,
    pub place: String,
    pub phone: Option<String>,
    pub date: Date,
    pub guests: i32,
    pub items: Json<Vec<BookingItem>>,
    pub assigned_staff: Vec<Uuid>,
    pub status: BookingStatus,
    pub cancel_request: bool,
    pub service_type: ServiceType,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<BookingRow> for Booking {
    fn from(r: BookingRow) -> Self {
        Self {
            id: r.id,
            customer: r.customer_id,
            event: r.event,
            place: r.place,
            phone: r.phone,
            date: r.date,
            guests: r.guests,
            items: r.items.0,
            assigned_staff: r.assigned_staff,
            status: r.status,
            cancel_request: r.cancel_request,
            service_type: r.service_type,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer: Uuid,
    pub event: String,
    pub place: String,
    pub phone: Option<String>,
    pub date: Date,
    pub guests: i32,
    pub items: Vec<BookingItem>,
    pub service_type: ServiceType,
}
