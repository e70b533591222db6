pub mod item;

pub use item::{Category, Item, ItemError, Label};
