pub mod alert;
pub mod binding;
pub mod enums;
pub mod filters;
pub mod measurement;
pub mod medication;
pub mod threshold;
pub mod user;

pub use alert::*;
pub use binding::*;
pub use enums::*;
pub use filters::*;
pub use measurement::*;
pub use medication::*;
pub use threshold::*;
pub use user::*;
