pub mod access;
pub mod cascade;
pub mod content;
pub mod delivery;
pub mod history;
pub mod notification;
pub mod purchase;
pub mod subscription;
pub mod two_factor;
