// Transport module: Abstract stream communication mechanisms
pub mod traits;
pub mod unix;
pub mod tcp;
pub mod endpoint;

pub use traits::*;
pub use unix::*;
pub use tcp::*;
pub use endpoint::*;
