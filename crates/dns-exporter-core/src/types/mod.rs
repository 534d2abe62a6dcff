mod record;
mod rules;
mod target;

pub use record::*;
pub use rules::*;
pub use target::*;
