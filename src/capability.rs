// Capability sets per protocol adapter. The protocols deliberately expose
// different operation subsets (the binary RPC surface has no list, update,
// or delete), so callers and tests query capabilities instead of assuming
// one uniform interface.

/// The operations a protocol surface may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

pub trait ProtocolAdapter {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &'static [Operation];

    fn supports(&self, op: Operation) -> bool {
        self.capabilities().contains(&op)
    }
}

pub const FULL_CAPABILITIES: &[Operation] = &[
    Operation::List,
    Operation::Get,
    Operation::Create,
    Operation::Update,
    Operation::Delete,
];

/// Single-record read plus create; the subset shared by the SOAP and
/// binary RPC surfaces.
pub const READ_CREATE_CAPABILITIES: &[Operation] = &[Operation::Get, Operation::Create];
