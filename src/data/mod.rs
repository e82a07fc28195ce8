pub mod loader;
pub mod scan;
pub mod synthetic;
pub mod table;

pub use loader::*;
pub use scan::*;
pub use synthetic::*;
pub use table::*;
