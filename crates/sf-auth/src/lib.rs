//! # sf-auth
//!
//! Authentication and authorization for Storefront RS.
//!
//! ## Features
//!
//! - JWT bearer tokens
//! - Argon2 password hashing
//! - Permission catalogue with role-based access control

pub mod jwt;
pub mod password;
pub mod permissions;

pub use jwt::{extract_bearer_token, Claims, IssuedToken, JwtError, JwtService};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{CurrentUser, Permission};
