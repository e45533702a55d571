mod metrics;
mod rotation;
mod sky;

pub use self::metrics::*;
pub use self::rotation::*;
pub use self::sky::*;
