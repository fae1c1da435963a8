pub mod country;
pub mod dates;
pub mod errors;
pub mod notification;
pub mod passport;
pub mod user;

pub use country::*;
pub use errors::*;
pub use notification::*;
pub use passport::*;
pub use user::*;
