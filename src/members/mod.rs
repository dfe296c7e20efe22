pub mod store;
pub mod types;
pub mod validate;

pub use store::{MemberStore, SharedMemberStore};
pub use types::{LookupResult, UserInfoResponse};
