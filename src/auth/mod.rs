pub mod claims;
pub(crate) mod extractors;
pub mod jwt;

pub use extractors::AuthMember;
