use assert_cmd::Command;
use std::path::Path;

pub fn run_ludvig_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("ludvig").expect("Failed to find ludvig binary");
    cmd.env("RUST_LOG", "ludvig=warn");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Run a command expected to succeed and return its standard output
pub fn ludvig_stdout(dir: &Path, args: &[&str]) -> Result<String, Box<dyn std::error::Error>> {
    let assert = run_ludvig_command(dir, args).assert().success();
    Ok(String::from_utf8(assert.get_output().stdout.clone())?)
}
