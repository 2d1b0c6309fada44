pub mod cache;
pub mod db;
pub mod peers;
pub mod waitlist;

pub use cache::ResponseCache;
pub use db::DashboardDb;
pub use peers::{PeerRecord, PeerStore};
pub use waitlist::Waitlist;
