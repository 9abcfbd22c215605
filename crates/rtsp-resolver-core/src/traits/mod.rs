//! Core traits for the resolver system
//!
//! - [`Resolver`]: Discover the final destination of a stream address

pub mod resolver;

pub use resolver::Resolver;
