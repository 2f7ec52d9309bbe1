use anyhow::{Context, Result};
use chatsync_application::{ChatsyncService, SyncReport};
use chatsync_core::UserIdentity;

pub async fn run(service: &ChatsyncService, user: String, token: String) -> Result<()> {
    println!("🔄 Syncing as {}...", user);
    let report = service
        .login(UserIdentity::new(user, token))
        .await
        .context("Sync failed")?;

    print_report("Sessions", &report.sessions);
    print_report("Hubs", &report.hubs);
    Ok(())
}

fn print_report(label: &str, report: &SyncReport) {
    println!(
        "  {}: {} uploaded, {} downloaded, {} local wins, {} remote wins, {} unchanged",
        label,
        report.uploaded,
        report.downloaded,
        report.local_wins,
        report.remote_wins,
        report.unchanged
    );
    for failure in &report.failures {
        println!(
            "    ⚠ {} ({:?}): {}",
            failure.id, failure.stage, failure.message
        );
    }
}
