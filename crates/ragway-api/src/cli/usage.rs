//! Usage report command.

use anyhow::Result;
use console::style;

use crate::state::AppState;

/// Print the current-period usage of `user_id`.
pub async fn show_usage(state: &AppState, user_id: &str, json: bool) -> Result<()> {
    let summary = state.pipeline.ledger().summary(user_id).await?;

    if json {
        let out = serde_json::json!({
            "user_id": summary.user_id,
            "period": summary.period,
            "period_start": summary.period_start.to_rfc3339(),
            "total_tokens": summary.total_tokens,
            "token_limit": summary.token_limit,
            "remaining_tokens": summary.remaining(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let limit = summary
        .token_limit
        .map_or_else(|| "unlimited".to_string(), |l| l.to_string());

    println!();
    println!(
        "  {} Usage for {} since {}",
        style("📊").bold(),
        style(&summary.user_id).cyan(),
        summary.period_start.format("%Y-%m-%d")
    );
    println!();
    println!("  Tokens used:  {}", style(summary.total_tokens).bold());
    println!("  Token limit:  {limit}");
    if summary.is_exhausted() {
        println!("  {}", style("Quota exhausted").red().bold());
    } else if let Some(remaining) = summary.remaining() {
        println!("  Remaining:    {}", style(remaining).green());
    }
    println!();
    Ok(())
}
