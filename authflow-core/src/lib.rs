//! Core functionality for the authflow client
//!
//! This crate contains everything the login and registration screens need apart from the
//! network transport and the durable token backend:
//!
//! - the local form rules in [`validation`]
//! - the [`TokenStore`] that keeps the session token in one persistent slot
//! - the [`IdentityService`] trait implemented by remote transports
//! - the [`LoginFlow`] and [`RegistrationFlow`] orchestrators the UI drives
//!
//! Storage backends implement [`storage::StorageProvider`], and transports implement
//! [`IdentityService`]. Most applications should depend on the `authflow` crate, which wires
//! the default SQLite backend and HTTP transport together.
pub mod error;
pub mod events;
pub mod flow;
pub mod form;
pub mod identity;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod validation;

pub use error::Error;
pub use events::{AuthEvent, EventBus, EventHandler};
pub use flow::{FormPhase, FormSnapshot, LoginFlow, RegistrationFlow, Resolution};
pub use form::{Field, FieldErrors, FormKind};
pub use identity::{AuthResponse, IdentityService, LoginRequest, RegisterRequest};
pub use session::{Session, SessionToken, UserProfile};
pub use storage::{StorageProvider, TokenStorage};
pub use token_store::TokenStore;
