pub mod models;

pub use models::{
    Address, AddressKind, Coupon, Order, OrderError, OrderItem, Payment, Refund,
};
