pub mod boiler;
pub mod demand;
pub mod forecast;

pub use boiler::*;
pub use demand::*;
pub use forecast::*;
