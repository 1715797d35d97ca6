pub mod member_access;

pub use member_access::*;
