mod exam;
mod question;
mod subscription;
mod ticket;
mod user;

pub use exam::*;
pub use question::*;
pub use subscription::*;
pub use ticket::*;
pub use user::*;
