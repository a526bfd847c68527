pub mod catalog;
pub mod chat;
pub mod history;
pub mod locale;
