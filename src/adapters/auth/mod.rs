//! Identity adapters implementing the `IdentityResolver` port.

mod in_memory;

pub use in_memory::InMemoryIdentityResolver;
