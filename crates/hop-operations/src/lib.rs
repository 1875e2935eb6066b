pub mod context;
pub mod types;
pub mod utils;

pub mod apply;
pub mod init;
pub mod prepare;
pub mod release;
pub mod restore;
pub mod stage;
pub mod status;
pub mod sync;
pub mod undo;
pub mod upgrade;

pub use context::{ContextParts, HopContext};
pub use types::*;
