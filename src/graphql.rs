// GraphQL adapter: single-endpoint query/mutation surface over the domain
// service. The schema is fixed and small, so the adapter carries its own
// minimal document parser: enough of the language for named operations,
// arguments (inline literals, input objects, $variables) and nested
// selection sets. Anything outside the schema is answered through the
// standard errors array, never a panic.
//
// Schema:
//   type Query {
//     reservations: [Reservation!]!
//     reservation(id: ID!): Reservation
//   }
//   type Mutation {
//     createReservation(client: ClientInput!, chambre: ChambreInput!,
//                       dateDebut: String!, dateFin: String!,
//                       preferences: String): Reservation!
//     updateReservation(id: ID!, dateDebut: String, dateFin: String,
//                       preferences: String): Reservation!
//     deleteReservation(id: ID!): Boolean!
//   }

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::capability::{Operation, ProtocolAdapter, FULL_CAPABILITIES};
use crate::domain::DomainError;
use crate::rest::{
    ClientFields, CreateReservationBody, ReservationBody, RoomFields, UpdateReservationBody,
};
use crate::service::ReservationService;

#[derive(Error, Debug)]
pub enum GraphQlError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("missing argument: {0}")]
    MissingArgument(String),

    #[error("invalid argument {0}: {1}")]
    InvalidArgument(String, String),
}

#[derive(Debug, Deserialize)]
struct GraphQlRequest {
    query: String,
    #[serde(default)]
    variables: Option<Map<String, Value>>,
}

pub struct GraphQlAdapter {
    service: Arc<ReservationService>,
}

impl GraphQlAdapter {
    pub fn new(service: Arc<ReservationService>) -> Self {
        Self { service }
    }

    /// Executes one request body (`{"query": ..., "variables": ...}`) and
    /// returns the standard GraphQL response object.
    pub async fn execute(&self, request_json: &str) -> Value {
        let request: GraphQlRequest = match serde_json::from_str(request_json) {
            Ok(request) => request,
            Err(err) => return error_response(&format!("invalid request body: {err}")),
        };
        let variables = request.variables.unwrap_or_default();

        let field = match parse_document(&request.query, &variables) {
            Ok(field) => field,
            Err(err) => {
                debug!(%err, "graphql document rejected");
                return error_response(&err.to_string());
            }
        };

        match self.resolve(&field).await {
            Ok(value) => {
                let mut data = Map::new();
                data.insert(field.name, value);
                json!({ "data": data })
            }
            Err(message) => error_response(&message),
        }
    }

    async fn resolve(&self, field: &Field) -> Result<Value, String> {
        match field.name.as_str() {
            "reservations" => {
                let reservations = self
                    .service
                    .list_reservations()
                    .await
                    .map_err(|err| domain_error_message(&err))?;
                let values: Vec<Value> = reservations
                    .into_iter()
                    .map(|r| field.selection.apply(&reservation_value(r)))
                    .collect();
                Ok(Value::Array(values))
            }
            "reservation" => {
                let id = id_arg(&field.arguments, "id").map_err(|e| e.to_string())?;
                match self.service.get_reservation(&id).await {
                    Ok(reservation) => Ok(field.selection.apply(&reservation_value(reservation))),
                    // Nullable by schema: an unknown id is null data, not an error.
                    Err(DomainError::NotFound(_)) => Ok(Value::Null),
                    Err(err) => Err(domain_error_message(&err)),
                }
            }
            "createReservation" => {
                let body = create_body(&field.arguments).map_err(|e| e.to_string())?;
                let draft = body.into_draft().map_err(|err| domain_error_message(&err))?;
                let reservation = self
                    .service
                    .create_reservation_with_new_parties(draft)
                    .await
                    .map_err(|err| domain_error_message(&err))?;
                Ok(field.selection.apply(&reservation_value(reservation)))
            }
            "updateReservation" => {
                let id = id_arg(&field.arguments, "id").map_err(|e| e.to_string())?;
                let body = UpdateReservationBody {
                    date_debut: optional_string_arg(&field.arguments, "dateDebut")
                        .map_err(|e| e.to_string())?,
                    date_fin: optional_string_arg(&field.arguments, "dateFin")
                        .map_err(|e| e.to_string())?,
                    preferences: optional_string_arg(&field.arguments, "preferences")
                        .map_err(|e| e.to_string())?,
                };
                let patch = body.into_patch().map_err(|err| domain_error_message(&err))?;
                let reservation = self
                    .service
                    .update_reservation(&id, patch)
                    .await
                    .map_err(|err| domain_error_message(&err))?;
                Ok(field.selection.apply(&reservation_value(reservation)))
            }
            "deleteReservation" => {
                let id = id_arg(&field.arguments, "id").map_err(|e| e.to_string())?;
                Ok(Value::Bool(self.service.delete_reservation(&id).await))
            }
            other => Err(GraphQlError::UnknownField(other.to_string()).to_string()),
        }
    }
}

impl ProtocolAdapter for GraphQlAdapter {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn capabilities(&self) -> &'static [Operation] {
        FULL_CAPABILITIES
    }
}

fn reservation_value(reservation: crate::domain::Reservation) -> Value {
    serde_json::to_value(ReservationBody::from(reservation)).unwrap_or(Value::Null)
}

fn error_response(message: &str) -> Value {
    json!({ "data": Value::Null, "errors": [{ "message": message }] })
}

fn domain_error_message(err: &DomainError) -> String {
    match err {
        DomainError::Validation(message) => message.clone(),
        DomainError::NotFound(_) => "reservation not found".to_string(),
        DomainError::Store(_) => "storage unavailable".to_string(),
        DomainError::Timeout(_) => "request timed out".to_string(),
    }
}

// ---- argument extraction ----

fn arg<'a>(arguments: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    arguments.get(name).filter(|value| !value.is_null())
}

// IDs arrive as strings or numbers depending on the client; both coerce to
// the canonical string identity.
fn id_arg(arguments: &Map<String, Value>, name: &str) -> Result<String, GraphQlError> {
    match arg(arguments, name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(GraphQlError::InvalidArgument(
            name.to_string(),
            format!("expected ID, got {other}"),
        )),
        None => Err(GraphQlError::MissingArgument(name.to_string())),
    }
}

fn string_arg(arguments: &Map<String, Value>, name: &str) -> Result<String, GraphQlError> {
    match arg(arguments, name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(GraphQlError::InvalidArgument(
            name.to_string(),
            format!("expected String, got {other}"),
        )),
        None => Err(GraphQlError::MissingArgument(name.to_string())),
    }
}

fn optional_string_arg(
    arguments: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, GraphQlError> {
    match arg(arguments, name) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(GraphQlError::InvalidArgument(
            name.to_string(),
            format!("expected String, got {other}"),
        )),
        None => Ok(None),
    }
}

fn input_object<T: serde::de::DeserializeOwned>(
    arguments: &Map<String, Value>,
    name: &str,
) -> Result<T, GraphQlError> {
    let value = arg(arguments, name)
        .ok_or_else(|| GraphQlError::MissingArgument(name.to_string()))?;
    serde_json::from_value(value.clone())
        .map_err(|err| GraphQlError::InvalidArgument(name.to_string(), err.to_string()))
}

fn create_body(arguments: &Map<String, Value>) -> Result<CreateReservationBody, GraphQlError> {
    Ok(CreateReservationBody {
        client: input_object::<ClientFields>(arguments, "client")?,
        chambre: input_object::<RoomFields>(arguments, "chambre")?,
        date_debut: string_arg(arguments, "dateDebut")?,
        date_fin: string_arg(arguments, "dateFin")?,
        preferences: optional_string_arg(arguments, "preferences")?,
    })
}

// ---- document parsing ----

/// The single root field of a parsed operation, with its arguments already
/// resolved against the request variables.
#[derive(Debug)]
struct Field {
    name: String,
    arguments: Map<String, Value>,
    selection: Selection,
}

/// A selection set; an empty set means "everything" (leaf position).
#[derive(Debug, Default)]
struct Selection {
    fields: Vec<(String, Selection)>,
}

impl Selection {
    fn apply(&self, value: &Value) -> Value {
        if self.fields.is_empty() {
            return value.clone();
        }
        match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.apply(item)).collect())
            }
            Value::Object(map) => {
                let mut out = Map::new();
                for (name, nested) in &self.fields {
                    let field_value = map.get(name).unwrap_or(&Value::Null);
                    out.insert(name.clone(), nested.apply(field_value));
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Number(String),
    Punct(char),
}

fn tokenize(src: &str) -> Result<Vec<Token>, GraphQlError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            // Commas are insignificant separators in GraphQL documents.
            _ if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            '#' => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('r') => s.push('\r'),
                            Some(escaped @ ('"' | '\\' | '/')) => s.push(escaped),
                            other => {
                                return Err(GraphQlError::Syntax(format!(
                                    "unsupported string escape {other:?}"
                                )))
                            }
                        },
                        Some(other) => s.push(other),
                        None => return Err(GraphQlError::Syntax("unterminated string".to_string())),
                    }
                }
                tokens.push(Token::Str(s));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            _ if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() || matches!(next, '.' | '-' | '+' | 'e' | 'E') {
                        number.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ':' | '$' | '!' | '@' | '=' => {
                tokens.push(Token::Punct(c));
                chars.next();
            }
            other => {
                return Err(GraphQlError::Syntax(format!("unexpected character {other:?}")));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    variables: &'a Map<String, Value>,
}

fn parse_document(query: &str, variables: &Map<String, Value>) -> Result<Field, GraphQlError> {
    let tokens = tokenize(query)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        variables,
    };
    parser.parse_operation()
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Token::Punct(c)) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_punct(&mut self, c: char) -> Result<(), GraphQlError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(GraphQlError::Syntax(format!(
                "expected {c:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expect_name(&mut self) -> Result<String, GraphQlError> {
        match self.next() {
            Some(Token::Name(name)) => Ok(name),
            other => Err(GraphQlError::Syntax(format!("expected a name, found {other:?}"))),
        }
    }

    fn parse_operation(&mut self) -> Result<Field, GraphQlError> {
        // Optional `query` / `mutation` keyword, operation name and variable
        // definitions; the definitions are only syntax to us since variable
        // values arrive pre-typed as JSON.
        if let Some(Token::Name(keyword)) = self.peek() {
            match keyword.as_str() {
                "query" | "mutation" => {
                    self.pos += 1;
                    if matches!(self.peek(), Some(Token::Name(_))) {
                        self.pos += 1;
                    }
                    if self.peek() == Some(&Token::Punct('(')) {
                        self.skip_balanced('(', ')')?;
                    }
                }
                "subscription" => {
                    return Err(GraphQlError::Syntax(
                        "subscriptions are not supported".to_string(),
                    ))
                }
                _ => {}
            }
        }

        self.expect_punct('{')?;
        let field = self.parse_field()?;
        // Remaining sibling fields (if any) are not supported; one root
        // field per request keeps resolution unambiguous.
        if !self.eat_punct('}') {
            return Err(GraphQlError::Syntax(
                "exactly one root field is supported per request".to_string(),
            ));
        }
        Ok(field)
    }

    fn parse_field(&mut self) -> Result<Field, GraphQlError> {
        let name = self.expect_name()?;

        let mut arguments = Map::new();
        if self.eat_punct('(') {
            while !self.eat_punct(')') {
                let arg_name = self.expect_name()?;
                self.expect_punct(':')?;
                let value = self.parse_value()?;
                arguments.insert(arg_name, value);
            }
        }

        let selection = if self.peek() == Some(&Token::Punct('{')) {
            self.parse_selection_set()?
        } else {
            Selection::default()
        };

        Ok(Field {
            name,
            arguments,
            selection,
        })
    }

    fn parse_selection_set(&mut self) -> Result<Selection, GraphQlError> {
        self.expect_punct('{')?;
        let mut fields = Vec::new();
        while !self.eat_punct('}') {
            let field = self.parse_field()?;
            fields.push((field.name, field.selection));
        }
        Ok(Selection { fields })
    }

    fn parse_value(&mut self) -> Result<Value, GraphQlError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Number(raw)) => parse_number(&raw),
            Some(Token::Name(name)) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                // Enum values are passed through as strings.
                other => Ok(Value::String(other.to_string())),
            },
            Some(Token::Punct('$')) => {
                let name = self.expect_name()?;
                Ok(self.variables.get(&name).cloned().unwrap_or(Value::Null))
            }
            Some(Token::Punct('{')) => {
                let mut object = Map::new();
                while !self.eat_punct('}') {
                    let key = self.expect_name()?;
                    self.expect_punct(':')?;
                    object.insert(key, self.parse_value()?);
                }
                Ok(Value::Object(object))
            }
            Some(Token::Punct('[')) => {
                let mut items = Vec::new();
                while !self.eat_punct(']') {
                    items.push(self.parse_value()?);
                }
                Ok(Value::Array(items))
            }
            other => Err(GraphQlError::Syntax(format!("expected a value, found {other:?}"))),
        }
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), GraphQlError> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next() {
                Some(Token::Punct(c)) if c == open => depth += 1,
                Some(Token::Punct(c)) if c == close => depth -= 1,
                Some(_) => {}
                None => {
                    return Err(GraphQlError::Syntax(format!("unbalanced {open:?}")));
                }
            }
        }
        Ok(())
    }
}

fn parse_number(raw: &str) -> Result<Value, GraphQlError> {
    if raw.contains(['.', 'e', 'E']) {
        let parsed: f64 = raw
            .parse()
            .map_err(|_| GraphQlError::Syntax(format!("bad number {raw:?}")))?;
        serde_json::Number::from_f64(parsed)
            .map(Value::Number)
            .ok_or_else(|| GraphQlError::Syntax(format!("bad number {raw:?}")))
    } else {
        let parsed: i64 = raw
            .parse()
            .map_err(|_| GraphQlError::Syntax(format!("bad number {raw:?}")))?;
        Ok(Value::Number(parsed.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn adapter() -> (Arc<InMemoryStore>, GraphQlAdapter) {
        let store = Arc::new(InMemoryStore::open());
        let service = Arc::new(ReservationService::new(store.clone()));
        (store, GraphQlAdapter::new(service))
    }

    fn request(query: &str) -> String {
        json!({ "query": query }).to_string()
    }

    const CREATE_MUTATION: &str = r#"
        mutation {
            createReservation(
                client: { nom: "Doe", prenom: "John", email: "john@example.com", telephone: "1234567890" }
                chambre: { type: "Double", prix: 100.0, disponible: true }
                dateDebut: "2023-10-01"
                dateFin: "2023-10-05"
            ) {
                id
                dateDebut
                dateFin
                preferences
                client { id nom prenom email telephone }
                chambre { id type prix disponible }
            }
        }
    "#;

    async fn create(adapter: &GraphQlAdapter) -> Value {
        let response = adapter.execute(&request(CREATE_MUTATION)).await;
        assert!(response.get("errors").is_none(), "unexpected errors: {response}");
        response["data"]["createReservation"].clone()
    }

    #[tokio::test]
    async fn test_create_with_inline_input_objects() {
        let (_, adapter) = adapter();
        let created = create(&adapter).await;

        assert!(created["id"].is_string());
        assert_eq!(created["client"]["nom"], "Doe");
        assert_eq!(created["chambre"]["prix"], 100.0);
        assert_eq!(created["chambre"]["disponible"], true);
        assert_eq!(created["dateDebut"], "2023-10-01");
        assert_eq!(created["dateFin"], "2023-10-05");
        assert_eq!(created["preferences"], Value::Null);
    }

    #[tokio::test]
    async fn test_create_with_variables() {
        let (_, adapter) = adapter();
        let body = json!({
            "query": "mutation Create($client: ClientInput!, $chambre: ChambreInput!, $start: String!, $end: String!, $prefs: String) {\
                createReservation(client: $client, chambre: $chambre, dateDebut: $start, dateFin: $end, preferences: $prefs) { id preferences }\
            }",
            "variables": {
                "client": { "nom": "Doe", "prenom": "Jane", "email": "jane@example.com", "telephone": "0987654321" },
                "chambre": { "type": "Suite", "prix": 250.5, "disponible": false },
                "start": "2024-01-01",
                "end": "2024-01-03",
                "prefs": "high floor"
            }
        });

        let response = adapter.execute(&body.to_string()).await;
        assert!(response.get("errors").is_none(), "unexpected errors: {response}");
        let created = &response["data"]["createReservation"];
        assert_eq!(created["preferences"], "high floor");
        // Selection set applied: unselected fields are omitted.
        assert!(created.get("client").is_none());
    }

    #[tokio::test]
    async fn test_query_reservation_with_nested_selection() {
        let (_, adapter) = adapter();
        let created = create(&adapter).await;
        let id = created["id"].as_str().unwrap();

        let query = format!(
            r#"query {{ reservation(id: "{id}") {{ id client {{ nom }} chambre {{ type }} }} }}"#
        );
        let response = adapter.execute(&request(&query)).await;
        let reservation = &response["data"]["reservation"];

        assert_eq!(reservation["id"], *id);
        assert_eq!(reservation["client"], json!({ "nom": "Doe" }));
        assert_eq!(reservation["chambre"], json!({ "type": "Double" }));
        assert!(reservation.get("dateDebut").is_none());
    }

    #[tokio::test]
    async fn test_unknown_id_yields_null_data_not_error() {
        let (_, adapter) = adapter();
        let response = adapter
            .execute(&request(r#"query { reservation(id: "404") { id } }"#))
            .await;
        assert_eq!(response["data"]["reservation"], Value::Null);
        assert!(response.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_numeric_id_coerces_to_canonical_string() {
        let (_, adapter) = adapter();
        let created = create(&adapter).await;
        let id: i64 = created["id"].as_str().unwrap().parse().unwrap();

        let body = json!({
            "query": "query Get($id: ID!) { reservation(id: $id) { id } }",
            "variables": { "id": id }
        });
        let response = adapter.execute(&body.to_string()).await;
        assert_eq!(response["data"]["reservation"]["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_reservations_lists_all() {
        let (_, adapter) = adapter();
        create(&adapter).await;
        create(&adapter).await;

        let response = adapter
            .execute(&request("query { reservations { id client { nom } } }"))
            .await;
        let list = response["data"]["reservations"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.iter().all(|r| r["client"]["nom"] == "Doe"));
    }

    #[tokio::test]
    async fn test_update_applies_only_present_arguments() {
        let (_, adapter) = adapter();
        let created = create(&adapter).await;
        let id = created["id"].as_str().unwrap();

        let mutation = format!(
            r#"mutation {{ updateReservation(id: "{id}", dateFin: "2023-10-10") {{ dateDebut dateFin }} }}"#
        );
        let response = adapter.execute(&request(&mutation)).await;
        let updated = &response["data"]["updateReservation"];
        assert_eq!(updated["dateDebut"], "2023-10-01");
        assert_eq!(updated["dateFin"], "2023-10-10");
    }

    #[tokio::test]
    async fn test_delete_returns_boolean() {
        let (_, adapter) = adapter();
        let created = create(&adapter).await;
        let id = created["id"].as_str().unwrap();

        let mutation = format!(r#"mutation {{ deleteReservation(id: "{id}") }}"#);
        let response = adapter.execute(&request(&mutation)).await;
        assert_eq!(response["data"]["deleteReservation"], true);

        let again = adapter.execute(&request(&mutation)).await;
        assert_eq!(again["data"]["deleteReservation"], false);
    }

    #[tokio::test]
    async fn test_validation_failure_fills_errors_array() {
        let (_, adapter) = adapter();
        let mutation = r#"mutation {
            createReservation(
                client: { nom: "", prenom: "J", email: "j@e.com", telephone: "1" }
                chambre: { type: "Double", prix: 100.0, disponible: true }
                dateDebut: "2023-10-01"
                dateFin: "2023-10-05"
            ) { id }
        }"#;
        let response = adapter.execute(&request(mutation)).await;
        assert_eq!(response["data"], Value::Null);
        let message = response["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("client.nom"));
    }

    #[tokio::test]
    async fn test_unknown_field_is_an_error() {
        let (_, adapter) = adapter();
        let response = adapter.execute(&request("query { rooms { id } }")).await;
        let message = response["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("rooms"));
    }

    #[tokio::test]
    async fn test_malformed_document_is_an_error() {
        let (_, adapter) = adapter();
        let response = adapter.execute(&request("query { reservation(id: }")).await;
        assert!(response["errors"][0]["message"].as_str().unwrap().contains("syntax"));
    }

    #[tokio::test]
    async fn test_closed_store_is_an_error() {
        let (store, adapter) = adapter();
        store.close();
        let response = adapter.execute(&request("query { reservations { id } }")).await;
        assert_eq!(
            response["errors"][0]["message"],
            "storage unavailable"
        );
    }

    #[test]
    fn test_capabilities_cover_all_operations() {
        let (_, adapter) = adapter();
        assert_eq!(adapter.name(), "graphql");
        assert!(adapter.supports(Operation::List));
        assert!(adapter.supports(Operation::Update));
        assert!(adapter.supports(Operation::Delete));
    }
}
