//! System commands: player probing and notifications

use tokio::process::Command;
use tracing::{debug, info};

/// Check that `program` can be executed
pub async fn check_command_available(program: &str) -> Result<(), String> {
    Command::new(program)
        .arg("--version")
        .output()
        .await
        .map_err(|_| format!("{} is not available on this system", program))?;

    info!("{} is available", program);
    Ok(())
}

/// Run a notification command with `message` as its only argument
pub async fn run_notify_command(program: &str, message: &str) -> Result<(), String> {
    debug!("Running {} for notification", program);

    let output = Command::new(program)
        .arg(message)
        .output()
        .await
        .map_err(|e| format!("Failed to execute {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} failed: {}", program, stderr.trim()));
    }

    info!("Notification sent via {}", program);
    Ok(())
}
