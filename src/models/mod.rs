pub mod issue;
pub mod opsgenie;
pub mod project;
pub mod search;
pub mod user;

pub use issue::*;
pub use opsgenie::*;
pub use project::*;
pub use search::*;
pub use user::*;
