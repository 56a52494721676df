//! Domain models for the storefront API.
//!
//! Wire representation is camelCase JSON; database columns are snake_case.
//! Order line items and the shipping address are frozen snapshots taken at
//! checkout time - they are stored verbatim and never re-derived from live
//! product or address rows.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod review;

pub use address::Address;
pub use cart::{Cart, CartLine};
pub use order::{AddressSnapshot, NewOrder, Order, OrderItem, OrderLine, PaymentCapture};
pub use product::Product;
pub use review::{NewReview, Review};
