//! Auth operations wrapped by [`AuthBridge`](crate::AuthBridge), plus project creation.

mod create_project;
mod login;
mod signup;

pub use create_project::{CreateProjectAction, CreateProjectInput};
pub use login::LoginAction;
pub use signup::{SignupAction, SignupInput};
