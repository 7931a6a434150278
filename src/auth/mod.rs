// Authentication module
// Manages the credential pair, its durable storage and token refresh

mod manager;
mod refresh;
mod storage;
mod types;

pub use manager::AuthManager;
pub use storage::{MemoryTokenStore, SqliteTokenStore, TokenStore};
pub use types::{CredentialSnapshot, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
