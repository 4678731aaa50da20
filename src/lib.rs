// src/lib.rs

pub mod core;

pub use core::client_wrapper::{ClientWrapper, Message, Role};
pub use core::coordinator::{Coordinator, CoordinatorRequest, CoordinatorResponse};
pub use core::error::CoreError;
pub use core::types::{AgentRole, ModelTier, StreamEvent};
