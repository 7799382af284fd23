// Session module: the transport seam plus the HTTP-backed implementation.

pub mod http;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use http::HttpSessionFactory;
pub use traits::{Session, SessionFactory};
