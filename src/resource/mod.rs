use std::sync::Arc;

use crate::backend::UserBackend;

pub mod health;
pub mod probe;
pub mod user;

/// Router state: the single backend shared by every handler
pub type AppState = Arc<dyn UserBackend>;
