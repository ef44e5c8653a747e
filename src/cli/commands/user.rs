use crate::api::payload::UserPayload;
use crate::cli::open_store;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::services::UserService;

pub async fn handle(
    config: AppConfig,
    email: String,
    password: String,
    name: Option<String>,
    staff: bool,
) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let payload = UserPayload::new(email, password, name);

    let user = UserService::new(store.as_ref(), &config.security)
        .create_user(payload, staff)
        .await
        .map_err(describe)?;

    println!("Created user {} (id {}{})", user.email, user.id, if staff { ", staff" } else { "" });
    Ok(())
}

/// Flatten field errors into one line for the terminal
fn describe(err: ApiError) -> anyhow::Error {
    match err.field_errors() {
        Some(fields) if !fields.is_empty() => {
            let mut parts: Vec<String> = fields.iter().map(|(f, m)| format!("{}: {}", f, m)).collect();
            parts.sort();
            anyhow::anyhow!(parts.join("; "))
        }
        _ => anyhow::anyhow!(err.to_string()),
    }
}
