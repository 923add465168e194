use anyhow::Context;
use chrono::{TimeZone, Utc};
use clap::Args;
use serde_json::json;

use crate::auth::{generate_token, Claims};
use crate::cli::OutputFormat;
use crate::config::SecurityConfig;

/// Upper bound on minted lifetimes (ten years).
const MAX_EXPIRY_HOURS: u64 = 24 * 365 * 10;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, default_value = "operator", help = "Subject claim")]
    pub sub: String,

    #[arg(long = "role", help = "Role to grant (repeatable); defaults to ADMIN_ROLE")]
    pub roles: Vec<String>,

    #[arg(long, help = "Lifetime in hours; defaults to JWT_EXPIRY_HOURS")]
    pub expires_hours: Option<u64>,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = SecurityConfig::from_env().context("loading token settings")?;
    let claims = build_claims(args, &security);
    let token = generate_token(&claims, &security.jwt_secret, security.jwt_algorithm)?;

    match output_format {
        OutputFormat::Json => {
            let expires_at = Utc.timestamp_opt(claims.exp, 0).single();
            println!(
                "{}",
                json!({
                    "token": token,
                    "sub": claims.sub,
                    "roles": claims.roles,
                    "expires_at": expires_at,
                })
            );
        }
        OutputFormat::Text => println!("{token}"),
    }
    Ok(())
}

fn build_claims(args: TokenArgs, security: &SecurityConfig) -> Claims {
    let roles = if args.roles.is_empty() {
        vec![security.admin_role.clone()]
    } else {
        args.roles
    };
    let hours = args
        .expires_hours
        .unwrap_or(security.jwt_expiry_hours)
        .min(MAX_EXPIRY_HOURS);
    Claims::new(args.sub, roles, hours as i64)
}
