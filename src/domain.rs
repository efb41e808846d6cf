// Canonical reservation model shared by every protocol adapter.
// No wire-format knowledge lives here; adapters convert at their boundary.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;

// Error types surfaced by the domain service
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("reservation {0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("request timed out after {0}ms")]
    Timeout(u64),
}

/// A hotel guest. Created implicitly as part of a reservation; the
/// embedded copy inside an expanded [`Reservation`] is a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

/// A bookable room. Like [`Client`], created implicitly with its reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: String,
    pub room_type: String,
    pub price: f64,
    pub available: bool,
}

/// A reservation with its client and room relations resolved inline.
/// Every read operation returns this expanded form.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub client: Client,
    pub room: Room,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub preferences: Option<String>,
}

// Field sets for creation. Ids are assigned by the store, never by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDraft {
    pub last_name: String,
    pub first_name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomDraft {
    pub room_type: String,
    pub price: f64,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationDraft {
    pub client: ClientDraft,
    pub room: RoomDraft,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub preferences: Option<String>,
}

impl ReservationDraft {
    /// Checks every required field before the store is touched.
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("client.nom", &self.client.last_name)?;
        require_text("client.prenom", &self.client.first_name)?;
        require_text("client.email", &self.client.email)?;
        require_text("client.telephone", &self.client.phone)?;
        require_text("chambre.type", &self.room.room_type)?;

        if self.room.price < 0.0 {
            return Err(DomainError::Validation(format!(
                "chambre.prix must be non-negative, got {}",
                self.room.price
            )));
        }

        check_date_order(self.start_date, self.end_date)
    }
}

/// Partial update for a reservation. Absent fields are left untouched,
/// never cleared. The attached client and room cannot be changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReservationPatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub preferences: Option<String>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.preferences.is_none()
    }
}

/// Parses an ISO-8601 calendar date (`YYYY-MM-DD`) from a wire payload.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DomainError::Validation(format!("{field} must be YYYY-MM-DD, got {raw:?}")))
}

pub fn check_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), DomainError> {
    if start > end {
        return Err(DomainError::Validation(format!(
            "dateDebut {start} is after dateFin {end}"
        )));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_draft() -> ReservationDraft {
    ReservationDraft {
        client: ClientDraft {
            last_name: "Doe".to_string(),
            first_name: "John".to_string(),
            email: "john@example.com".to_string(),
            phone: "1234567890".to_string(),
        },
        room: RoomDraft {
            room_type: "Double".to_string(),
            price: 100.0,
            available: true,
        },
        start_date: NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2023, 10, 5).unwrap(),
        preferences: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_valid_draft_passes() {
        assert!(sample_draft().validate().is_ok());
    }

    #[test_case(|d: &mut ReservationDraft| d.client.last_name.clear(); "missing nom")]
    #[test_case(|d: &mut ReservationDraft| d.client.first_name = "  ".to_string(); "blank prenom")]
    #[test_case(|d: &mut ReservationDraft| d.client.email.clear(); "missing email")]
    #[test_case(|d: &mut ReservationDraft| d.client.phone.clear(); "missing telephone")]
    #[test_case(|d: &mut ReservationDraft| d.room.room_type.clear(); "missing room type")]
    #[test_case(|d: &mut ReservationDraft| d.room.price = -1.0; "negative price")]
    fn test_invalid_draft_rejected(mutate: fn(&mut ReservationDraft)) {
        let mut draft = sample_draft();
        mutate(&mut draft);
        assert!(matches!(draft.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_start_after_end_rejected() {
        let mut draft = sample_draft();
        draft.end_date = NaiveDate::from_ymd_opt(2023, 9, 30).unwrap();
        let err = draft.validate().unwrap_err();
        assert!(err.to_string().contains("dateDebut"));
    }

    #[test]
    fn test_parse_date_accepts_iso() {
        let date = parse_date("dateDebut", "2023-10-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 10, 1).unwrap());
    }

    #[test_case("01/10/2023"; "slash format")]
    #[test_case("2023-13-01"; "bad month")]
    #[test_case("tomorrow"; "free text")]
    fn test_parse_date_rejects(raw: &str) {
        assert!(matches!(
            parse_date("dateFin", raw),
            Err(DomainError::Validation(_))
        ));
    }
}
