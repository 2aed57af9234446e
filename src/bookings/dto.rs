use serde::{Deserialize, Serialize};

use super::repo_types::{Booking, BookingItem};
use crate::validation::double_option;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub customer_id: Option<String>,
    pub event: Option<String>,
    pub place: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub guests: Option<i64>,
    #[serde(default)]
    pub items: Vec<BookingItem>,
    pub service_type: Option<String>,
}

/// Partial update. For nullable fields an explicit `null` is distinct from
/// an absent key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub event: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub place: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date: Option<Option<String>>,
    pub guests: Option<i64>,
    pub items: Option<Vec<BookingItem>>,
    pub assigned_staff: Option<Vec<String>>,
    pub status: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveCancelRequest {
    pub approve: bool,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub message: &'static str,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub count: usize,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}
