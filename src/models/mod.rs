mod category;
mod customer;
mod product;
mod user;

pub use category::*;
pub use customer::*;
pub use product::*;
pub use user::*;
