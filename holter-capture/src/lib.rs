pub mod acquisition;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod sensor;
pub mod session;

pub use acquisition::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use metrics::*;
pub use sensor::*;
pub use session::*;
