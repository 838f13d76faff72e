//! CQRS 分发核心（cqrs-core）
//!
//! 提供类型安全、可插拔的命令/查询分发引擎：
//! - 契约（`request`、`command`、`query`、`handler`）：请求在类型层面声明其结果类型；
//! - 注册表（`registry`）：按请求类型精确匹配唯一处理器，启动期注册、分发期只读；
//! - 行为管道（`pipeline`）：有序的横切行为链，支持短路与 LIFO 展开；
//! - 分发器（`dispatcher`）：解析处理器与行为链并执行，始终返回 `AppResult`；
//! - 内置行为（`behavior`）：校验、日志、事务。
//!
//! 典型用法：
//! 1. 为请求类型实现 `Request` 以及 `Command` 或 `Query`；
//! 2. 为处理器实现 `RequestHandler<R>`；
//! 3. 通过 `Dispatcher::builder()` 注册处理器与行为，`build()` 冻结；
//! 4. 传输层构造请求后调用 `RequestBus::dispatch`，再把 `AppResult` 转换为自身的响应形式。
//!
pub mod behavior;
pub mod bus;
pub mod command;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod request;

pub use bus::RequestBus;
pub use command::Command;
pub use context::AppContext;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{AppResult, Failure, FailureKind, RegistryError};
pub use handler::RequestHandler;
pub use query::Query;
pub use request::{Request, RequestKind};
