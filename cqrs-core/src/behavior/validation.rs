//! 校验行为（ValidationBehavior）
//!
//! 在调用处理器之前对请求运行一组纯函数校验器：
//! - 声明式：`FieldRule`（`not_empty`、`max_length`、`email` 或自定义谓词）；
//! - 过程式：`Fn(&R, &mut Violations)` 闭包。
//!
//! 收集全部字段的违规后统一短路，返回 `FailureKind::Validation`，处理器不会被调用。
//!
use crate::{
    context::AppContext,
    error::Failure,
    pipeline::{Behavior, Envelope, Next, PipelineResult},
    request::Request,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// 字段级违规集合（字段名 -> 原因，同一字段保留首个原因）
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Violations {
    inner: BTreeMap<String, String>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.inner.entry(field.into()).or_insert_with(|| reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.inner.get(field).map(String::as_str)
    }

    pub fn into_failure(self) -> Failure {
        Failure::validation(self.inner)
    }
}

/// 校验器：请求的纯函数，不允许 I/O
pub trait Validator<R>: Send + Sync {
    fn validate(&self, request: &R, violations: &mut Violations);
}

/// 声明式字段规则：谓词不满足时记录 `field -> reason`
pub struct FieldRule<R> {
    field: String,
    reason: String,
    predicate: Box<dyn Fn(&R) -> bool + Send + Sync>,
}

impl<R> FieldRule<R> {
    pub fn new(
        field: impl Into<String>,
        reason: impl Into<String>,
        predicate: impl Fn(&R) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            predicate: Box::new(predicate),
        }
    }
}

impl<R> Validator<R> for FieldRule<R> {
    fn validate(&self, request: &R, violations: &mut Violations) {
        if !(self.predicate)(request) {
            violations.add(self.field.clone(), self.reason.clone());
        }
    }
}

/// 字段去除空白后不得为空
pub fn not_empty<R: 'static>(field: impl Into<String>, get: fn(&R) -> &str) -> FieldRule<R> {
    FieldRule::new(field, "must not be empty", move |r| !get(r).trim().is_empty())
}

/// 字段字符数不得超过 `max`
pub fn max_length<R: 'static>(
    field: impl Into<String>,
    max: usize,
    get: fn(&R) -> &str,
) -> FieldRule<R> {
    FieldRule::new(
        field,
        format!("must be at most {max} characters"),
        move |r| get(r).chars().count() <= max,
    )
}

/// 粗粒度的邮箱格式检查：`local@domain.tld`，空值交由 `not_empty` 处理
pub fn email<R: 'static>(field: impl Into<String>, get: fn(&R) -> &str) -> FieldRule<R> {
    FieldRule::new(field, "must be a valid email address", move |r| {
        let value = get(r).trim();
        if value.is_empty() {
            return true;
        }
        match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .split_once('.')
                        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            }
            None => false,
        }
    })
}

struct FnValidator<F>(F);

impl<R, F> Validator<R> for FnValidator<F>
where
    F: Fn(&R, &mut Violations) + Send + Sync,
{
    fn validate(&self, request: &R, violations: &mut Violations) {
        (self.0)(request, violations)
    }
}

/// 针对请求类型 `R` 的校验行为；其他类型的请求原样放行
pub struct ValidationBehavior<R> {
    validators: Vec<Box<dyn Validator<R>>>,
}

impl<R: Request> Default for ValidationBehavior<R> {
    fn default() -> Self {
        Self {
            validators: Vec::new(),
        }
    }
}

impl<R: Request> ValidationBehavior<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: FieldRule<R>) -> Self {
        self.validators.push(Box::new(rule));
        self
    }

    pub fn validator(mut self, validator: impl Validator<R> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// 过程式校验
    pub fn check(mut self, f: impl Fn(&R, &mut Violations) + Send + Sync + 'static) -> Self {
        self.validators.push(Box::new(FnValidator(f)));
        self
    }

    pub fn validate(&self, request: &R) -> Violations {
        let mut violations = Violations::new();
        for v in &self.validators {
            v.validate(request, &mut violations);
        }
        violations
    }
}

#[async_trait]
impl<R: Request> Behavior for ValidationBehavior<R> {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        _ctx: &AppContext,
        envelope: Envelope,
        next: Next<'_>,
    ) -> PipelineResult {
        let violations = match envelope.downcast_ref::<R>() {
            Some(request) => self.validate(request),
            None => return next.run(envelope).await,
        };

        if !violations.is_empty() {
            tracing::debug!(
                request = envelope.name(),
                fields = violations.len(),
                "request rejected by validation"
            );
            return Err(violations.into_failure());
        }

        next.run(envelope).await
    }
}
