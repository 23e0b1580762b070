pub mod share_service;

pub use share_service::ShareService;
