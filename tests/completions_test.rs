#![cfg(feature = "cli")]
//! Integration tests for `mybinlog completions`.

use clap::CommandFactory;
use mysqlbinlog::cli::app::Cli;

fn generate_completions(shell: clap_complete::Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "mybinlog", &mut buf);
    String::from_utf8(buf).expect("completions should be valid UTF-8")
}

#[test]
fn bash_completions_contain_subcommands() {
    let output = generate_completions(clap_complete::Shell::Bash);
    assert!(output.contains("mybinlog"));
    assert!(output.contains("events"));
    assert!(output.contains("info"));
    assert!(output.contains("completions"));
    assert!(output.contains("--strict"));
}

#[test]
fn zsh_completions_are_valid() {
    let output = generate_completions(clap_complete::Shell::Zsh);
    assert!(output.contains("mybinlog"));
}

#[test]
fn fish_completions_are_valid() {
    let output = generate_completions(clap_complete::Shell::Fish);
    assert!(output.contains("mybinlog"));
    assert!(output.contains("limit"));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
