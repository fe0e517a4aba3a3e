pub mod dataset;
pub mod series;
pub mod value;

pub use dataset::*;
pub use series::*;
pub use value::*;
