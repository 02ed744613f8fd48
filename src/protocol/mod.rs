//! Request dispatch
//!
//! This module maps an HTTP method and path onto store operations and
//! turns their results into replies.

pub mod command;
pub mod dispatcher;
pub mod reply;

pub use command::Command;
pub use dispatcher::Dispatcher;
pub use reply::Reply;
