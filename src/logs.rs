//! Log retrieval from `screen` sessions.
//!
//! Sessions are discovered with `screen -ls`; a tail is captured by asking
//! the session for a `hardcopy` into a temp file and reading its last lines.

use color_eyre::Result;
use tokio::process::Command;

/// List the names of attached and detached screen sessions.
///
/// `screen -ls` exits non-zero when no sessions exist, so the exit status is
/// ignored and only the output is parsed.
pub async fn list_sessions() -> Result<Vec<String>> {
    let output = Command::new("screen").arg("-ls").output().await?;
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(parse_session_list(&text))
}

fn parse_session_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("Detached") || line.contains("Attached"))
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| name.to_owned())
        .collect()
}

/// Tail the last `lines` lines of a screen session.
///
/// Failures are folded into the returned text; a live log view renders the
/// error in place of content and retries on its next refresh.
pub async fn tail(session: &str, lines: usize) -> String {
    match hardcopy(session).await {
        Ok(content) => format!(
            "Logs for session {session}:\n{}",
            last_lines(&content, lines)
        ),
        Err(e) => format!("Error: {e}"),
    }
}

async fn hardcopy(session: &str) -> Result<String> {
    let path = std::env::temp_dir().join(format!("corral-hardcopy-{}.txt", sanitize(session)));

    let status = Command::new("screen")
        .args(["-S", session, "-X", "hardcopy"])
        .arg(&path)
        .status()
        .await?;
    if !status.success() {
        color_eyre::eyre::bail!("screen session {session} not available");
    }

    // hardcopy writes asynchronously; give screen a moment to flush.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    Ok(tokio::fs::read_to_string(&path).await?)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn last_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].join("\n")
}
