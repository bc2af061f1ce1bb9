use clap::Args;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Identity subject, matched against users.clerkIdentifier")]
    pub subject: String,

    #[arg(long, help = "Email claim")]
    pub email: Option<String>,

    #[arg(long, help = "Display name claim")]
    pub name: Option<String>,

    #[arg(long, help = "Lifetime in hours (defaults to SECURITY_JWT_EXPIRY_HOURS)")]
    pub hours: Option<u64>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config().security;
    let hours = args.hours.unwrap_or(security.jwt_expiry_hours);

    let claims = Claims::new(args.subject, args.email, args.name, hours);
    let token = generate_jwt(&claims, security)?;

    output_value(&output_format, "token", &token)
}
