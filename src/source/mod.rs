// Asset source abstraction: where served bytes come from.

pub mod fs_source;
pub mod traits;
