pub mod agistment;
pub mod changes;
pub mod drafts;
pub mod entity;
pub mod error;
pub mod field_group;
pub mod fingerprint;
pub mod photos;
pub mod ports;
pub mod session;
pub mod value_objects;
