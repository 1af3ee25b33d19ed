//! Bearer-token checks at the edge. Tokens are issued by the account service
//! and carry the user identifier in `sub`.

pub mod jwt;
pub mod middleware;
