//! Command implementations.

mod info;
mod post;
mod validate;

pub use info::run_info;
pub use post::run_post;
pub use validate::run_validate;
