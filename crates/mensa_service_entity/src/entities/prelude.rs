pub use super::dish::Entity as Dish;
pub use super::mensa::Entity as Mensa;
pub use super::review::Entity as Review;
