// Licensed under the Apache-2.0 license

use anyhow::Result;

mod checks;

const USAGE: &str = "\
Usage: cargo xtask <task>

Tasks:
  test     run unit tests
  clippy   run clippy with warnings denied
  doc      build the API docs
  fmt      check formatting
  ci       all of the above";

fn main() -> Result<()> {
    let task = std::env::args().nth(1);

    match task.as_deref() {
        Some("test") => checks::test(),
        Some("clippy") => checks::clippy(),
        Some("doc") => checks::doc(),
        Some("fmt") => checks::fmt_check(),
        Some("ci") => {
            checks::fmt_check()?;
            checks::clippy()?;
            checks::test()?;
            checks::doc()
        }
        _ => {
            println!("{USAGE}");
            Ok(())
        }
    }
}
