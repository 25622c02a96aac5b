pub mod health;
pub mod portlet;
