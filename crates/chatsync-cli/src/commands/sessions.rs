use anyhow::{Context, Result, bail};
use chatsync_application::ChatsyncService;
use chatsync_core::WriteOutcome;
use std::fs;
use std::path::{Path, PathBuf};

use super::describe;

pub async fn list(service: &ChatsyncService) -> Result<()> {
    let report = service.sessions().load().await.context("Failed to load sessions")?;
    let sessions = service.sessions().list_sessions();

    if sessions.is_empty() {
        println!("No sessions.");
        return Ok(());
    }

    println!("📋 {} sessions ({}):", report.count, describe_source(&report.source));
    for session in sessions {
        let branch = match session.parent_session_id() {
            Some(parent) => format!("  ⑂ {}", parent),
            None => String::new(),
        };
        println!(
            "  {}  {}  {:>3} msgs  {}{}",
            session.id,
            session.updated_at.format("%Y-%m-%d %H:%M"),
            session.messages.len(),
            session.title,
            branch
        );
    }
    Ok(())
}

fn describe_source(source: &WriteOutcome) -> &'static str {
    match source {
        WriteOutcome::Remote => "server",
        WriteOutcome::Local => "this device",
        WriteOutcome::Degraded { .. } => "this device, server unavailable",
    }
}

pub async fn create(service: &ChatsyncService, title: Option<String>) -> Result<()> {
    let sessions = service.sessions();
    let written = sessions.create_session(None).await.context("Failed to create session")?;
    let mut session = written.value;
    let mut outcome = written.outcome;

    if let Some(title) = title {
        if let Some(renamed) = sessions
            .rename_session(&session.id, title)
            .await
            .context("Failed to set title")?
        {
            session = renamed.value;
            outcome = renamed.outcome;
        }
    }

    println!("✅ Created '{}' ({}): {}", session.title, session.id, describe(&outcome));
    Ok(())
}

pub async fn export(service: &ChatsyncService, out: Option<PathBuf>) -> Result<()> {
    service.sessions().load().await.context("Failed to load sessions")?;
    let json = service
        .sessions()
        .export_all_sessions()
        .context("Failed to export sessions")?;

    match out {
        Some(path) => {
            fs::write(&path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "✅ Exported {} sessions to {}",
                service.sessions().list_sessions().len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

pub async fn import(service: &ChatsyncService, file: &Path) -> Result<()> {
    let json =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let outcome = service
        .sessions()
        .import_all_sessions(&json)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!(
        "✅ Imported {} sessions: {}",
        service.sessions().list_sessions().len(),
        describe(&outcome)
    );
    Ok(())
}

pub async fn clear(service: &ChatsyncService, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete all sessions and hubs without --yes");
    }

    service
        .sessions()
        .clear_all_sessions()
        .await
        .context("Failed to clear sessions")?;
    service
        .hubs()
        .clear_all_hubs()
        .await
        .context("Failed to clear hubs")?;

    println!("🗑  Cleared all sessions and hubs");
    Ok(())
}
