//! API key management commands.

use anyhow::Result;
use console::style;

use ragway_core::repository::api_key::ApiKeyRepository;
use ragway_types::auth::ApiKeyRecord;

use crate::http::extractors::auth::generate_api_key;
use crate::state::AppState;

/// Create a key for `user_id` and print it once.
pub async fn create_key(state: &AppState, user_id: &str, json: bool) -> Result<()> {
    let generated = generate_api_key();
    let record = ApiKeyRecord::new(user_id, generated.prefix, generated.hash);
    state.api_keys.create(&record).await?;

    if json {
        let out = serde_json::json!({
            "id": record.id.to_string(),
            "user_id": record.user_id,
            "key": generated.plaintext,
            "created_at": record.created_at.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} API key created for {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(user_id).cyan()
    );
    println!();
    println!("  {}", style(&generated.plaintext).yellow().bold());
    println!();
    Ok(())
}

/// List the key prefixes belonging to `user_id`.
pub async fn list_keys(state: &AppState, user_id: &str, json: bool) -> Result<()> {
    let keys = state.api_keys.list_for_user(user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
        return Ok(());
    }

    if keys.is_empty() {
        println!("  No API keys for {}", style(user_id).cyan());
        return Ok(());
    }

    println!();
    for key in &keys {
        println!(
            "  {}…  {}  {}",
            style(&key.key_prefix).yellow(),
            style(key.created_at.format("%Y-%m-%d %H:%M")).dim(),
            key.id
        );
    }
    println!();
    Ok(())
}
