mod pool;
mod record;
mod state;
mod unavailable_queue;

pub use pool::{AcquireError, CredentialPool};
pub use record::CredentialRecord;
pub use state::{CredentialId, CredentialState, UnavailableReason};
