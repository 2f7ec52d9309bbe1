use anyhow::{Context, Result};
use chatsync_infrastructure::ConfigService;

pub fn init(service: &ConfigService) -> Result<()> {
    let created = service
        .init()
        .with_context(|| format!("Failed to write {}", service.path().display()))?;

    if created {
        println!("✅ Wrote default config to {}", service.path().display());
        println!("\n💡 Add a [remote] section (or set CHATSYNC_REMOTE_URL and CHATSYNC_REMOTE_API_KEY) to enable sync.");
    } else {
        println!("Config already exists at {}", service.path().display());
    }
    Ok(())
}
