//! Component Templates
//!
//! A template fixes the seed and the ordered characteristic list of one
//! kind of product as the consuming tool expects to read it back.
//!
//! ```text
//! registry.json ──▶ RegistrySource ──▶ TemplateRegistry ──▶ get / all_of_kind
//! ```

pub mod builtin;
pub mod registry;
pub mod schema;

pub use registry::TemplateRegistry;
pub use schema::{Characteristic, ComponentKind, RegistrySource, Seed, Template};
