// SOAP adapter: XML-envelope RPC mapping of the domain service. Two
// operations are exposed on this surface: getReservation and
// createReservation. Requests are parsed by local element name so any
// namespace prefix works; responses are constructed with every text value
// XML-escaped, and failures always render as a well-formed Fault.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::capability::{Operation, ProtocolAdapter, READ_CREATE_CAPABILITIES};
use crate::domain::{
    parse_date, ClientDraft, DomainError, Reservation, ReservationDraft, RoomDraft,
};
use crate::service::ReservationService;

pub const SOAPENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const HOTEL_NS: &str = "http://example.com/hotel/soap";

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("no supported operation element in request body")]
    NoOperation,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("missing required element: {0}")]
    MissingField(String),
}

#[derive(Debug, PartialEq)]
enum SoapRequest {
    GetReservation { id: String },
    CreateReservation(CreateFields),
}

// Raw field text as extracted from the request document; converted into a
// typed draft only after the envelope is fully parsed.
#[derive(Debug, Default, PartialEq)]
struct CreateFields {
    nom: String,
    prenom: String,
    email: String,
    telephone: String,
    room_type: String,
    prix: String,
    disponible: String,
    date_debut: String,
    date_fin: String,
    preferences: Option<String>,
}

pub struct SoapAdapter {
    service: Arc<ReservationService>,
}

impl SoapAdapter {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }

    /// Handles one envelope and always returns a well-formed response
    /// document: an operation response on success, a Fault otherwise.
    pub async fn handle(&self, request_xml: &str) -> String {
        let request = match parse_request(request_xml) {
            Ok(request) => request,
            Err(err) => {
                debug!(%err, "soap request rejected");
                return fault("soapenv:Client", &format!("malformed request: {err}"));
            }
        };

        match request {
            SoapRequest::GetReservation { id } => match self.service.get_reservation(&id).await {
                Ok(reservation) => operation_response("getReservationResponse", &reservation),
                Err(err) => domain_fault(&err),
            },
            SoapRequest::CreateReservation(fields) => {
                let draft = match fields.into_draft() {
                    Ok(draft) => draft,
                    Err(err) => return domain_fault(&err),
                };
                match self.service.create_reservation_with_new_parties(draft).await {
                    Ok(reservation) => {
                        operation_response("createReservationResponse", &reservation)
                    }
                    Err(err) => domain_fault(&err),
                }
            }
        }
    }
}

impl ProtocolAdapter for SoapAdapter {
    fn name(&self) -> &'static str {
        "soap"
    }

    fn capabilities(&self) -> &'static [Operation] {
        READ_CREATE_CAPABILITIES
    }
}

impl CreateFields {
    fn into_draft(self) -> Result<ReservationDraft, DomainError> {
        let price: f64 = self.prix.parse().map_err(|_| {
            DomainError::Validation(format!("chambre.prix must be a number, got {:?}", self.prix))
        })?;
        let available: bool = self.disponible.parse().map_err(|_| {
            DomainError::Validation(format!(
                "chambre.disponible must be true or false, got {:?}",
                self.disponible
            ))
        })?;

        Ok(ReservationDraft {
            client: ClientDraft {
                last_name: self.nom,
                first_name: self.prenom,
                email: self.email,
                phone: self.telephone,
            },
            room: RoomDraft {
                room_type: self.room_type,
                price,
                available,
            },
            start_date: parse_date("dateDebut", &self.date_debut)?,
            end_date: parse_date("dateFin", &self.date_fin)?,
            preferences: self.preferences,
        })
    }
}

// Walks the document once, collecting leaf text keyed by element name
// (qualified with "client." / "chambre." when nested under those elements)
// and remembering which *Request operation element was seen.
fn parse_request(xml: &str) -> Result<SoapRequest, SoapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut operation: Option<String> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if operation.is_none() && name.ends_with("Request") {
                    operation = Some(name.clone());
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .xml_content()
                    .map_err(|e| SoapError::XmlParse(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                if let Some(leaf) = stack.last() {
                    let scope = stack
                        .iter()
                        .rev()
                        .skip(1)
                        .find(|name| name.as_str() == "client" || name.as_str() == "chambre");
                    let key = match scope {
                        Some(scope) => format!("{scope}.{leaf}"),
                        None => leaf.clone(),
                    };
                    fields.insert(key, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SoapError::XmlParse(e.to_string())),
            _ => (),
        }
    }

    match operation.as_deref() {
        Some("getReservationRequest") => Ok(SoapRequest::GetReservation {
            id: take(&mut fields, "id")?,
        }),
        Some("createReservationRequest") => Ok(SoapRequest::CreateReservation(CreateFields {
            nom: take(&mut fields, "client.nom")?,
            prenom: take(&mut fields, "client.prenom")?,
            email: take(&mut fields, "client.email")?,
            telephone: take(&mut fields, "client.telephone")?,
            room_type: take(&mut fields, "chambre.type")?,
            prix: take(&mut fields, "chambre.prix")?,
            disponible: take(&mut fields, "chambre.disponible")?,
            date_debut: take(&mut fields, "dateDebut")?,
            date_fin: take(&mut fields, "dateFin")?,
            preferences: fields.remove("preferences"),
        })),
        Some(other) => Err(SoapError::UnsupportedOperation(other.to_string())),
        None => Err(SoapError::NoOperation),
    }
}

fn take(fields: &mut HashMap<String, String>, key: &str) -> Result<String, SoapError> {
    fields
        .remove(key)
        .ok_or_else(|| SoapError::MissingField(key.to_string()))
}

// ---- response construction ----

fn envelope(body: &str) -> String {
    format!(
        "<soapenv:Envelope xmlns:soapenv=\"{SOAPENV_NS}\" xmlns:res=\"{HOTEL_NS}\">\
         <soapenv:Header/><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"
    )
}

fn operation_response(operation: &str, reservation: &Reservation) -> String {
    envelope(&format!(
        "<res:{operation}>{}</res:{operation}>",
        reservation_element(reservation)
    ))
}

fn reservation_element(reservation: &Reservation) -> String {
    let mut xml = String::from("<res:reservation>");
    push_leaf(&mut xml, "id", &reservation.id);
    push_leaf(&mut xml, "dateDebut", &reservation.start_date.to_string());
    push_leaf(&mut xml, "dateFin", &reservation.end_date.to_string());
    if let Some(preferences) = &reservation.preferences {
        push_leaf(&mut xml, "preferences", preferences);
    }

    xml.push_str("<res:client>");
    push_leaf(&mut xml, "id", &reservation.client.id);
    push_leaf(&mut xml, "nom", &reservation.client.last_name);
    push_leaf(&mut xml, "prenom", &reservation.client.first_name);
    push_leaf(&mut xml, "email", &reservation.client.email);
    push_leaf(&mut xml, "telephone", &reservation.client.phone);
    xml.push_str("</res:client>");

    xml.push_str("<res:chambre>");
    push_leaf(&mut xml, "id", &reservation.room.id);
    push_leaf(&mut xml, "type", &reservation.room.room_type);
    push_leaf(&mut xml, "prix", &reservation.room.price.to_string());
    push_leaf(&mut xml, "disponible", &reservation.room.available.to_string());
    xml.push_str("</res:chambre>");

    xml.push_str("</res:reservation>");
    xml
}

// Every text value goes through escape(); free-text fields routinely carry
// '&', '<' and quotes.
fn push_leaf(buf: &mut String, name: &str, value: &str) {
    buf.push_str("<res:");
    buf.push_str(name);
    buf.push('>');
    buf.push_str(&escape(value));
    buf.push_str("</res:");
    buf.push_str(name);
    buf.push('>');
}

fn fault(code: &str, message: &str) -> String {
    envelope(&format!(
        "<soapenv:Fault><faultcode>{code}</faultcode><faultstring>{}</faultstring></soapenv:Fault>",
        escape(message)
    ))
}

fn domain_fault(err: &DomainError) -> String {
    match err {
        DomainError::Validation(message) => fault("soapenv:Client", message),
        DomainError::NotFound(_) => fault("soapenv:Client", "reservation not found"),
        DomainError::Store(_) => fault("soapenv:Server", "storage unavailable"),
        DomainError::Timeout(_) => fault("soapenv:Server", "request timed out"),
    }
}
