use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Register,
    Unregister,
}

// A sign-up or removal that has been sent and not yet answered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub activity: String,
    pub email: String,
}
