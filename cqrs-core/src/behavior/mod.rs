//! 内置行为
//!
//! - `validation`：请求校验，失败即短路；
//! - `logging`：tracing span、耗时与结果日志；
//! - `transaction`：命令级工作单元，成功提交、失败回滚。
//!
pub mod logging;
pub mod transaction;
pub mod validation;

pub use logging::{LoggingBehavior, LoggingConfig};
pub use transaction::{TransactionBehavior, UnitOfWork, UnitOfWorkFactory};
pub use validation::{FieldRule, ValidationBehavior, Validator, Violations};
