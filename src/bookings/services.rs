use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{CreateBookingRequest, UpdateBookingRequest};
use super::repo_types::{Booking, BookingStatus, NewBooking, ServiceType};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::validation::{parse_date, parse_enum, parse_id, required_text, well_formed_ids};

fn check_phone(raw: &str) -> AppResult<Option<String>> {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    }
    let phone = raw.trim();
    if phone.is_empty() {
        return Ok(None);
    }
    if !PHONE_RE.is_match(phone) {
        warn!(phone = %phone, "invalid phone number");
        return Err(AppError::Validation("Invalid phone number format".into()));
    }
    Ok(Some(phone.to_string()))
}

fn check_guests(guests: i64) -> AppResult<i32> {
    if guests < 0 {
        return Err(AppError::Validation("guests cannot be negative".into()));
    }
    i32::try_from(guests).map_err(|_| AppError::Validation("guests is too large".into()))
}

/// Flags the booking as awaiting a privileged decision. Status is untouched.
pub(crate) fn request_cancellation(booking: &mut Booking) -> AppResult<()> {
    if booking.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Cannot cancel a {} booking",
            booking.status.as_str()
        )));
    }
    if booking.cancel_request {
        return Err(AppError::Conflict("Cancel request already pending".into()));
    }
    booking.cancel_request = true;
    Ok(())
}

/// Approving cancels the booking; rejecting only clears the request.
pub(crate) fn resolve_cancellation(booking: &mut Booking, approve: bool) -> AppResult<()> {
    if !booking.cancel_request {
        return Err(AppError::InvalidTransition("No cancel request pending".into()));
    }
    if approve {
        booking.status = BookingStatus::Cancelled;
    }
    booking.cancel_request = false;
    Ok(())
}

/// Forward-only moves along pending -> confirmed -> completed. `cancelled` is
/// reachable only through the cancel request workflow.
pub(crate) fn advance_status(booking: &mut Booking, next: BookingStatus) -> AppResult<()> {
    fn rank(s: BookingStatus) -> u8 {
        match s {
            BookingStatus::Pending => 0,
            BookingStatus::Confirmed => 1,
            BookingStatus::Completed | BookingStatus::Cancelled => 2,
        }
    }

    if next == booking.status {
        return Ok(());
    }
    if booking.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Booking is {} and can no longer change status",
            booking.status.as_str()
        )));
    }
    if next == BookingStatus::Cancelled {
        return Err(AppError::InvalidTransition(
            "Cancellation must go through a cancel request".into(),
        ));
    }
    if rank(next) < rank(booking.status) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot move a booking from {} back to {}",
            booking.status.as_str(),
            next.as_str()
        )));
    }
    if next == BookingStatus::Completed && booking.cancel_request {
        return Err(AppError::InvalidTransition(
            "Resolve the pending cancel request first".into(),
        ));
    }
    booking.status = next;
    Ok(())
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Booking> {
    state
        .bookings
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))
}

fn changed_underneath() -> AppError {
    AppError::Conflict("Booking was changed by another request, reload and retry".into())
}

pub async fn create(state: &AppState, req: CreateBookingRequest) -> AppResult<Booking> {
    let customer_raw = required_text("customerId", req.customer_id.as_deref())?;
    let event = required_text("event", req.event.as_deref())?;
    let date = parse_date("date", &required_text("date", req.date.as_deref())?)?;
    let customer = parse_id("customerId", &customer_raw)?;
    let phone = match req.phone.as_deref() {
        Some(p) => check_phone(p)?,
        None => None,
    };
    let guests = check_guests(req.guests.unwrap_or(0))?;
    let service_type = match req.service_type.as_deref() {
        Some(raw) => parse_enum::<ServiceType>("serviceType", raw)?,
        None => ServiceType::default(),
    };

    if state.users.find_by_id(customer).await?.is_none() {
        warn!(%customer, "booking for unknown customer");
        return Err(AppError::NotFound("Customer not found".into()));
    }

    let booking = state
        .bookings
        .insert(NewBooking {
            customer,
            event,
            place: req.place.unwrap_or_default().trim().to_string(),
            phone,
            date,
            guests,
            items: req.items,
            service_type,
        })
        .await?;

    info!(booking_id = %booking.id, %customer, "booking created");
    Ok(booking)
}

pub async fn get(state: &AppState, id: Uuid) -> AppResult<Booking> {
    load(state, id).await
}

pub async fn update(state: &AppState, id: Uuid, req: UpdateBookingRequest) -> AppResult<Booking> {
    let mut booking = load(state, id).await?;
    let expected = booking.status;

    if let Some(event) = req.event {
        booking.event = required_text("event", event.as_deref())?;
    }
    if let Some(place) = req.place {
        booking.place = place.unwrap_or_default().trim().to_string();
    }
    if let Some(phone) = req.phone {
        booking.phone = match phone {
            Some(p) => check_phone(&p)?,
            None => None,
        };
    }
    if let Some(date) = req.date {
        let raw = required_text("date", date.as_deref())?;
        booking.date = parse_date("date", &raw)?;
    }
    if let Some(guests) = req.guests {
        booking.guests = check_guests(guests)?;
    }
    if let Some(items) = req.items {
        booking.items = items;
    }
    if let Some(raw) = req.service_type {
        booking.service_type = parse_enum("serviceType", &raw)?;
    }
    if let Some(raw_staff) = req.assigned_staff {
        let staff = well_formed_ids(&raw_staff);
        if staff.len() != raw_staff.len() {
            return Err(AppError::Validation(
                "assignedStaff must contain distinct, valid ids".into(),
            ));
        }
        let found = state.users.find_many(&staff).await?;
        if let Some(missing) = staff.iter().find(|id| !found.iter().any(|u| u.id == **id)) {
            return Err(AppError::NotFound(format!("Staff member {missing} not found")));
        }
        booking.assigned_staff = staff;
    }
    let next = match req.status {
        Some(raw) => Some(parse_enum::<BookingStatus>("status", &raw)?),
        None => None,
    };
    if let Some(next) = next {
        advance_status(&mut booking, next)?;
    }

    let Some(booking) = state.bookings.save(&booking, expected).await? else {
        // The status or cancel flag moved since the load; judge the request
        // against the current row.
        let mut current = load(state, id).await?;
        if let Some(next) = next {
            advance_status(&mut current, next)?;
        }
        warn!(booking_id = %id, "booking changed during update");
        return Err(changed_underneath());
    };
    info!(booking_id = %booking.id, status = booking.status.as_str(), "booking updated");
    Ok(booking)
}

pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
    if !state.bookings.delete(id).await? {
        return Err(AppError::NotFound("Booking not found".into()));
    }
    info!(booking_id = %id, "booking deleted");
    Ok(())
}

pub async fn request_cancel(state: &AppState, id: Uuid) -> AppResult<Booking> {
    let Some(booking) = state.bookings.flag_cancel_request(id).await? else {
        let mut current = load(state, id).await?;
        request_cancellation(&mut current)?;
        return Err(changed_underneath());
    };
    info!(booking_id = %booking.id, "cancel request submitted");
    Ok(booking)
}

pub async fn resolve_cancel(state: &AppState, id: Uuid, approve: bool) -> AppResult<Booking> {
    let Some(booking) = state.bookings.resolve_cancel_request(id, approve).await? else {
        let mut current = load(state, id).await?;
        resolve_cancellation(&mut current, approve)?;
        return Err(changed_underneath());
    };
    info!(booking_id = %booking.id, approve, status = booking.status.as_str(), "cancel request resolved");
    Ok(booking)
}
