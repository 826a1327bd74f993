//! Client-side identity: the persisted credential, the stores that hold it and
//! the cheap local guard run on page load.

mod credential;
mod store;
mod guard;

pub use credential::{Credential, Role, MIN_TOKEN_LEN};
pub use store::{CredentialStore, SharedCredentials, MemoryStore, FileStore};
pub use guard::SessionGuard;
pub(crate) use guard::end_session;
