pub mod categories;
pub mod related;
