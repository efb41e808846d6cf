// Main library file for the reservation gateway

// Export modules for each layer of the gateway
pub mod capability;
pub mod domain;
pub mod graphql;
pub mod rest;
pub mod rpc;
pub mod service;
pub mod soap;
pub mod store;

// Re-export key types for convenience
pub use capability::{Operation, ProtocolAdapter};
pub use domain::{
    Client, ClientDraft, DomainError, Reservation, ReservationDraft, ReservationPatch, Room,
    RoomDraft,
};
pub use graphql::GraphQlAdapter;
pub use rest::{RestAdapter, RestResponse};
pub use rpc::{RpcAdapter, RpcMessage, RpcStatus};
pub use service::{ReservationService, ServiceConfig};
pub use soap::SoapAdapter;
pub use store::{InMemoryStore, ReservationStore, StoreError};
