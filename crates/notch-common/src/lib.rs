pub mod errors;
pub mod id;
pub mod status;
pub mod types;

pub use errors::{ConfigError, NotchError, PlatformError};
pub use id::{new_id, SessionId};
pub use status::{StatusLevel, StatusMessage, StatusQueue};
pub use types::{BackendKind, DropSubmitPolicy};

pub type Result<T> = std::result::Result<T, NotchError>;
