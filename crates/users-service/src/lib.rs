//! # Users Service
//!
//! Backend service owning the user store. Consumes `REGISTER_USER_RPC`,
//! `LIST_USERS_RPC`, `UPDATE_USER_RPC`, and `SEND_EMAIL` from the shared
//! topic and answers RPC-style commands over the response queue.
//!
//! The HTTP surface for these operations lives in the `api-gateway` crate;
//! this crate is the consuming side only.

pub mod dispatcher;
pub mod mailer;
pub mod repository;
pub mod schemas;

pub use dispatcher::{
    EventDispatcher, UserEvent, LIST_USERS_RPC, REGISTER_USER_RPC, SEND_EMAIL, UPDATE_USER_RPC,
    USER_REGISTERED_EVENT, USER_UPDATED_EVENT,
};
pub use mailer::{LogMailer, Mailer};
pub use repository::UserRepository;
pub use schemas::{EmailRequest, User, UserCreate, UserFilter, UserUpdate};
