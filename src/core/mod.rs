//! Template model shared by every unit
//!
//! Stacks of resources, intrinsic-function tokens, IAM statements, and the
//! assembly of synthesized templates written to disk.

pub mod assembly;
pub mod bucket;
pub mod error;
pub mod naming;
pub mod policy;
pub mod template;
pub mod token;

pub use assembly::Assembly;
pub use bucket::BucketRef;
pub use error::SynthError;
pub use naming::Naming;
pub use template::{Environment, Resource, Stack};
pub use token::Token;
