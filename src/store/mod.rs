pub mod documents;
pub mod iterator;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use documents::*;
pub use iterator::*;
pub use memory::*;
pub use postgres::*;
pub use traits::*;
