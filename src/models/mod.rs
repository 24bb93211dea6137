pub mod user;
pub mod crop;
pub mod market;
pub mod price;
pub mod alert;
pub mod notification;

pub use user::{CurrentUser, User};
pub use crop::Crop;
pub use market::Market;
pub use price::PriceObservation;
pub use alert::Alert;
pub use notification::{NotificationKind, NotificationRecord};
