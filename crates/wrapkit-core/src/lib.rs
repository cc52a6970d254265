//! wrapkit core - contract wrapper interface extraction
//!
//! Reads TypeScript contract wrappers, describes their callable operations
//! as a JSON schema for form-rendering front ends, and turns the filled-in
//! forms back into calls.
//!
//! # Architecture
//!
//! ```text
//! Wrapper source → Parser → SourceUnit → Extractor (+ Resolver) → WrapperInfo → wrappers.json
//!                     ↓                                                   ↓
//!              Import closure                                     Overlay → config.json
//!
//! Filled ArgumentMap → Bridge → ModuleLoader → ContractInstance::invoke
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: the same sources always produce identical schema output
//! - **Isolated failures**: one broken wrapper never blocks the others
//! - **Terminating**: cyclic types and cyclic imports are resolved once

pub mod artifacts;
pub mod bridge;
pub mod config;
pub mod error;
pub mod extractor;
pub mod imports;
pub mod overlay;
pub mod parser;
pub mod resolver;
pub mod schema;

pub use error::{Error, Result};
pub use schema::{
    DefinedType, DefinedTypes, DeployData, Functions, ParamInfo, ParamType, Parameters, UnionMember, WrapperInfo,
    WrappersData,
};
