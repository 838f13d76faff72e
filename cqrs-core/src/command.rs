use crate::request::Request;

/// 应用层命令（Command）
///
/// 表达“意图”的写操作请求，通常会修改状态并产出 `Request::Output`。
/// - 与 [`Query`](crate::query::Query) 相对，`Command` 应避免读写混用；
/// - 建议保持语义化的“动宾结构”命名，如 `LoginCommand`、`CloseOrder`。
pub trait Command: Request {}
