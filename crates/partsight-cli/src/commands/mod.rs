//! Command implementations.

pub mod decode;
pub mod identify;
pub mod models;
pub mod profile;
pub mod scan;

pub use self::decode::execute_decode;
pub use self::identify::execute_identify;
pub use self::models::execute_models;
pub use self::profile::execute_profile;
pub use self::scan::execute_scan;
