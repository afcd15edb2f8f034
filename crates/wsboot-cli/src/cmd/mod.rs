pub mod create;
pub mod rollback;
pub mod snapshot;
pub mod tiers;
pub mod upgrade;
pub mod validate;

use std::io::{BufRead, Write};

/// Ask a yes/no question on stdin. Anything but `y`/`yes` (including EOF)
/// is a no.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
