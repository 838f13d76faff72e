use async_trait::async_trait;
use cqrs_core::behavior::validation::{email, not_empty};
use cqrs_core::behavior::{LoggingBehavior, ValidationBehavior};
use cqrs_core::{
    AppContext, AppResult, Command, Dispatcher, FailureKind, Query, Request, RequestBus,
    RequestHandler,
};
use std::sync::Arc;

#[derive(Debug)]
struct LoginCommand {
    email: String,
}

impl Request for LoginCommand {
    const NAME: &'static str = "LoginCommand";
    type Output = String;
}
impl Command for LoginCommand {}

struct LoginHandler;

#[async_trait]
impl RequestHandler<LoginCommand> for LoginHandler {
    async fn handle(&self, _ctx: &AppContext, cmd: LoginCommand) -> AppResult<String> {
        println!("LoginCommand: email={}", cmd.email);
        Ok("session-token-abc".to_string())
    }
}

#[derive(Debug)]
struct WhoAmI;

impl Request for WhoAmI {
    const NAME: &'static str = "WhoAmI";
    type Output = Option<String>;
}
impl Query for WhoAmI {}

struct WhoAmIHandler;

#[async_trait]
impl RequestHandler<WhoAmI> for WhoAmIHandler {
    async fn handle(&self, ctx: &AppContext, _q: WhoAmI) -> AppResult<Option<String>> {
        Ok(ctx.actor_id().map(str::to_owned))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = Dispatcher::builder();
    builder
        .behavior(Arc::new(LoggingBehavior::default()))
        .register_command::<LoginCommand, _>(Arc::new(LoginHandler))?
        .with_behavior::<LoginCommand>(Arc::new(
            ValidationBehavior::new()
                .rule(not_empty("Email", |c: &LoginCommand| c.email.as_str()))
                .rule(email("Email", |c: &LoginCommand| c.email.as_str())),
        ))?
        .register_query::<WhoAmI, _>(Arc::new(WhoAmIHandler))?
        .expect::<LoginCommand>()
        .expect::<WhoAmI>();
    let dispatcher = builder.build()?;

    let ctx = AppContext::builder()
        .correlation_id("cor-1")
        .causation_id("cau-1")
        .actor_id("u-1")
        .idempotency_key("idem-1")
        .build();

    let token = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: "alice@example.com".into(),
            },
        )
        .await?;
    println!("token={token}");

    let me = dispatcher.dispatch(&ctx, WhoAmI).await?;
    println!("actor={me:?}");

    // 空邮箱 -> 校验失败，处理器不会被调用
    if let Err(f) = dispatcher
        .dispatch(
            &ctx,
            LoginCommand {
                email: String::new(),
            },
        )
        .await
    {
        eprintln!("rejected as expected: {f} {:?}", f.details());
    }

    // 未注册的命令 -> HandlerNotFound
    #[derive(Debug)]
    struct Logout;

    impl Request for Logout {
        const NAME: &'static str = "Logout";
        type Output = ();
    }
    impl Command for Logout {}

    match dispatcher.dispatch(&ctx, Logout).await {
        Err(f) if f.kind() == FailureKind::HandlerNotFound => {
            eprintln!("HandlerNotFound as expected for command: {}", f.message())
        }
        other => eprintln!("unexpected outcome: {other:?}"),
    }
    Ok(())
}
