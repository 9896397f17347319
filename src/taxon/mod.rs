pub mod name;
pub mod normalizer;
pub mod registry;
pub mod surrogate;

pub use name::{CanonicalForm, Name, NewName};
pub use normalizer::prepare_clean_name;
pub use registry::NameRegistry;
pub use surrogate::is_surrogate_or_hybrid;
