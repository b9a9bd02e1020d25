//! Behavioral events that can trigger workflows

mod entity;

pub use entity::UserEvent;
