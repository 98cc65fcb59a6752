pub mod projection;
pub mod resolver;

pub use projection::{Disclosure, ProjectedView};
pub use resolver::{resolve, resolve_audited, Resolution};
