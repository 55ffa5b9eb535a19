//! Command implementations. Each prints its result to stdout.

pub mod account;
pub mod admin;
pub mod catalog;
pub mod notifications;
pub mod orders;
pub mod shopping;

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
}

/// Report a failure on stderr, for when logging is filtered out.
#[allow(clippy::print_stderr)]
pub fn fail(message: &str) {
    eprintln!("error: {message}");
}
