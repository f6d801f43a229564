// Library surface for the CLI and integration tests.
pub mod achievements;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod goals;
pub mod legacy;
pub mod logging;
pub mod runtime;
pub mod seed;
pub mod session;
pub mod stats;
pub mod store;
pub mod timer;
pub mod util;

pub use error::{Error, Result};
pub use session::{Session, SessionId};
pub use stats::Period;
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use timer::SessionTimer;
