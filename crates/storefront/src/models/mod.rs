//! Wire models for the REST API.
//!
//! Field casing follows the API, which is not uniform: cart, wishlist and
//! catalog payloads are snake_case while users, notifications, orders and
//! addresses are camelCase.

mod cart;
mod identity;
mod notification;
mod order;
mod product;

pub use cart::{CartLine, WishlistEntry, cart_item_count, cart_total};
pub(crate) use cart::{AddCartItem, ProductRef, QuantityBody};
pub use identity::{Identity, ProfileUpdate, SignUp};
pub(crate) use identity::{LoginBody, LoginResponse, SignUpBody};
pub use notification::{NewNotification, Notification};
pub(crate) use notification::{LOCAL_ID_PREFIX, is_local_id};
pub use order::{Address, NewOrder, NewOrderItem, Order, OrderItem, OrderQuery, ShippingAddress};
pub use product::{
    Brand, Category, LOW_STOCK_THRESHOLD, NewReview, Product, ProductQuery, ProductSnapshot,
    Review, ReviewUpdate, SortOrder, StockLevel,
};
