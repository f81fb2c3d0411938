//! Authentication for grapevine
//!
//! Token issuance lives in the account service; grapevine only verifies
//! the bearer credential a client presents at handshake time.

pub mod jwt;

pub use jwt::{extract_token_from_header, extract_token_from_query, Claims, JwtValidator};
