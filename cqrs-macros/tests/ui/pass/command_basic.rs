use cqrs_core::{Command, Request};
use cqrs_macros::command;

#[command(result = String)]
struct LoginCommand {
    email: String,
}

#[command(result = (), name = "users.logout")]
#[derive(Hash)]
struct Logout(u64);

fn assert_command<C: Command>() {}

fn main() {
    assert_command::<LoginCommand>();
    assert_command::<Logout>();

    assert_eq!(<LoginCommand as Request>::NAME, "LoginCommand");
    assert_eq!(<Logout as Request>::NAME, "users.logout");

    // Debug/Clone/PartialEq 可用
    let a = LoginCommand {
        email: "a@b.io".into(),
    };
    let b = a.clone();
    assert_eq!(a, b);
    let _ = format!("{:?}", Logout(1));

    let out: <LoginCommand as Request>::Output = String::new();
    let _ = out;
}
