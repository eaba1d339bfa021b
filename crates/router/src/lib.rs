//! # Router
//!
//! 路由模块。
//!
//! 负责：
//! - 编译路由树（match / drop 谓词，正则）
//! - 对每个事件做前序遍历，选出 receivers
//! - 并发分发到 `ReceiverRegistry`，支持整树原子替换

pub mod error;
pub mod predicate;
pub mod route;
pub mod router;

#[cfg(test)]
mod test_support;

pub use error::RouterError;
pub use predicate::{Matcher, Predicate};
pub use route::{Route, Selection};
pub use router::{ROOT_LABEL, RouteOutcome, Router};
