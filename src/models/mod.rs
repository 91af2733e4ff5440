pub mod activity;
pub mod pending_mutation;
pub mod status_message;

pub use activity::{Activity, ActivityName, Snapshot};
pub use pending_mutation::{MutationKind, PendingMutation};
pub use status_message::{MessageKind, StatusMessage};
