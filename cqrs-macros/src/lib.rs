//! 请求声明宏
//!
//! 把普通结构体/枚举声明为不可变、按值比较的请求类型：
//!
//! ```ignore
//! use cqrs_macros::command;
//!
//! #[command(result = String)]
//! pub struct LoginCommand {
//!     pub email: String,
//! }
//! ```
//!
use proc_macro::TokenStream;

mod derive_utils;
mod request;

/// 命令宏：`#[command(result = Type, name = "...")]`
/// - 派生 `Debug`, `Clone`, `PartialEq`（与已有 derive 合并去重）
/// - 实现 `::cqrs_core::Request` 与 `::cqrs_core::Command`
#[proc_macro_attribute]
pub fn command(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(request::Kind::Command, attr, item)
}

/// 查询宏：`#[query(result = Type, name = "...")]`
/// - 派生 `Debug`, `Clone`, `PartialEq`（与已有 derive 合并去重）
/// - 实现 `::cqrs_core::Request` 与 `::cqrs_core::Query`
#[proc_macro_attribute]
pub fn query(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(request::Kind::Query, attr, item)
}
