use crate::core::{print_success, CommandContext, Result};

pub fn execute_clear_cache(context: &CommandContext) -> Result<()> {
    let removed = context.cache.clear();
    log::debug!("Removed {removed} entries from {}", context.cache.root().display());
    print_success(&format!("Removed {removed} cached inventories\n"));
    Ok(())
}
