// REST adapter: JSON-over-HTTP mapping of the domain service. This is the
// transport-independent core of the surface. It takes the method, path and
// body of a request and produces the status code and JSON body of the
// response; an HTTP listener in front of it is pure plumbing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::capability::{Operation, ProtocolAdapter, FULL_CAPABILITIES};
use crate::domain::{
    parse_date, ClientDraft, DomainError, Reservation, ReservationDraft, ReservationPatch,
    RoomDraft,
};
use crate::service::ReservationService;

// Wire shape of an expanded reservation. Ids always serialize as strings;
// field names follow the established wire vocabulary (nom/prenom/telephone,
// type/prix/disponible, dateDebut/dateFin) across all four protocols.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReservationBody {
    pub id: String,
    pub client: ClientBody,
    pub chambre: RoomBody,
    #[serde(rename = "dateDebut")]
    pub date_debut: String,
    #[serde(rename = "dateFin")]
    pub date_fin: String,
    pub preferences: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ClientBody {
    pub id: String,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RoomBody {
    pub id: String,
    #[serde(rename = "type")]
    pub room_type: String,
    pub prix: f64,
    pub disponible: bool,
}

impl From<Reservation> for ReservationBody {
    fn from(reservation: Reservation) -> Self {
        ReservationBody {
            id: reservation.id,
            client: ClientBody {
                id: reservation.client.id,
                nom: reservation.client.last_name,
                prenom: reservation.client.first_name,
                email: reservation.client.email,
                telephone: reservation.client.phone,
            },
            chambre: RoomBody {
                id: reservation.room.id,
                room_type: reservation.room.room_type,
                prix: reservation.room.price,
                disponible: reservation.room.available,
            },
            date_debut: reservation.start_date.to_string(),
            date_fin: reservation.end_date.to_string(),
            preferences: reservation.preferences,
        }
    }
}

// Creation payload: full nested client/room fields, no ids.
#[derive(Debug, Deserialize)]
pub struct CreateReservationBody {
    pub client: ClientFields,
    pub chambre: RoomFields,
    #[serde(rename = "dateDebut")]
    pub date_debut: String,
    #[serde(rename = "dateFin")]
    pub date_fin: String,
    #[serde(default)]
    pub preferences: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClientFields {
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomFields {
    #[serde(rename = "type")]
    pub room_type: String,
    pub prix: f64,
    pub disponible: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateReservationBody {
    #[serde(rename = "dateDebut")]
    pub date_debut: Option<String>,
    #[serde(rename = "dateFin")]
    pub date_fin: Option<String>,
    pub preferences: Option<String>,
}

impl CreateReservationBody {
    pub fn into_draft(self) -> Result<ReservationDraft, DomainError> {
        Ok(ReservationDraft {
            client: ClientDraft {
                last_name: self.client.nom,
                first_name: self.client.prenom,
                email: self.client.email,
                phone: self.client.telephone,
            },
            room: RoomDraft {
                room_type: self.chambre.room_type,
                price: self.chambre.prix,
                available: self.chambre.disponible,
            },
            start_date: parse_date("dateDebut", &self.date_debut)?,
            end_date: parse_date("dateFin", &self.date_fin)?,
            preferences: self.preferences,
        })
    }
}

impl UpdateReservationBody {
    pub fn into_patch(self) -> Result<ReservationPatch, DomainError> {
        Ok(ReservationPatch {
            start_date: self
                .date_debut
                .as_deref()
                .map(|raw| parse_date("dateDebut", raw))
                .transpose()?,
            end_date: self
                .date_fin
                .as_deref()
                .map(|raw| parse_date("dateFin", raw))
                .transpose()?,
            preferences: self.preferences,
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct RestResponse {
    pub status: u16,
    pub body: Value,
}

impl RestResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
        }
    }
}

pub struct RestAdapter {
    service: Arc<ReservationService>,
}

impl RestAdapter {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }

    /// Dispatches one request. Routes:
    /// `GET /reservations`, `GET|PUT|DELETE /reservations/{id}`,
    /// `POST /reservations`.
    pub async fn handle(&self, method: &str, path: &str, body: Option<&str>) -> RestResponse {
        debug!(method, path, "rest request");
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            ("GET", ["reservations"]) => self.list().await,
            ("GET", ["reservations", id]) => self.get(id).await,
            ("POST", ["reservations"]) => self.create(body).await,
            ("PUT", ["reservations", id]) => self.update(id, body).await,
            ("DELETE", ["reservations", id]) => self.delete(id).await,
            _ => RestResponse::error(404, "unknown route"),
        }
    }

    async fn list(&self) -> RestResponse {
        match self.service.list_reservations().await {
            Ok(reservations) => {
                let bodies: Vec<ReservationBody> =
                    reservations.into_iter().map(ReservationBody::from).collect();
                RestResponse::ok(serde_json::to_value(bodies).unwrap_or(Value::Null))
            }
            Err(err) => domain_error_response(&err),
        }
    }

    async fn get(&self, id: &str) -> RestResponse {
        match self.service.get_reservation(id).await {
            Ok(reservation) => RestResponse::ok(reservation_json(reservation)),
            Err(err) => domain_error_response(&err),
        }
    }

    async fn create(&self, body: Option<&str>) -> RestResponse {
        let parsed: CreateReservationBody = match parse_body(body) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        let draft = match parsed.into_draft() {
            Ok(draft) => draft,
            Err(err) => return domain_error_response(&err),
        };

        match self.service.create_reservation_with_new_parties(draft).await {
            Ok(reservation) => RestResponse::ok(reservation_json(reservation)),
            Err(err) => domain_error_response(&err),
        }
    }

    async fn update(&self, id: &str, body: Option<&str>) -> RestResponse {
        let parsed: UpdateReservationBody = match parse_body(body) {
            Ok(parsed) => parsed,
            Err(response) => return response,
        };
        let patch = match parsed.into_patch() {
            Ok(patch) => patch,
            Err(err) => return domain_error_response(&err),
        };

        match self.service.update_reservation(id, patch).await {
            Ok(reservation) => RestResponse::ok(reservation_json(reservation)),
            Err(err) => domain_error_response(&err),
        }
    }

    async fn delete(&self, id: &str) -> RestResponse {
        let deleted = self.service.delete_reservation(id).await;
        RestResponse::ok(json!({ "deleted": deleted }))
    }
}

impl ProtocolAdapter for RestAdapter {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn capabilities(&self) -> &'static [Operation] {
        FULL_CAPABILITIES
    }
}

fn reservation_json(reservation: Reservation) -> Value {
    serde_json::to_value(ReservationBody::from(reservation)).unwrap_or(Value::Null)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: Option<&str>) -> Result<T, RestResponse> {
    let raw = body.ok_or_else(|| RestResponse::error(400, "request body is required"))?;
    serde_json::from_str(raw)
        .map_err(|err| RestResponse::error(400, &format!("invalid JSON body: {err}")))
}

// Domain errors map to a small fixed set of statuses and messages; store
// internals are never forwarded to the client.
fn domain_error_response(err: &DomainError) -> RestResponse {
    match err {
        DomainError::Validation(message) => RestResponse::error(400, message),
        DomainError::NotFound(_) => RestResponse::error(404, "reservation not found"),
        DomainError::Store(_) => RestResponse::error(500, "storage unavailable"),
        DomainError::Timeout(_) => RestResponse::error(504, "request timed out"),
    }
}
