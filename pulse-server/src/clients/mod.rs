//! External collaborator clients
//!
//! The pipeline touches two remote services: the third-party API proxy
//! that fetches raw integration data, and the generated-code service that
//! produces and executes transformers. Both sit behind traits so the
//! executor can be driven by stubs in tests.

mod source;
mod transformer;

pub use source::{HttpSourceClient, SourceClient};
pub use transformer::{HttpTransformerClient, TransformerClient};
