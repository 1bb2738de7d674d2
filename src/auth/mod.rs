//! Authentication: JWT issuance/validation, password hashing, and the
//! request extractor that turns a bearer token into a [`CurrentUser`].

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::CurrentUser;
pub use jwt::{Claims, JwtConfig, JwtService};
