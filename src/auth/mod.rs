//! Authentication module
//!
//! This module handles user registration, credential verification,
//! session tokens and the password reset flow.

pub mod handlers;
mod hasher;
mod service;
mod token;

pub use hasher::{BcryptHasher, CredentialHasher, MAX_COST, MAX_PASSWORD_BYTES, MIN_COST};
pub use service::AuthService;
pub use token::generate_token;
