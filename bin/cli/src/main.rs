mod commands;
mod error;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use storefront_auth::{
    AdminUserUpdate, ChangePasswordForm, ConfirmEmailForm, GuardKind, ProfilePatch, RegisterForm,
    ResetPasswordForm,
};
use storefront_core::{Result, UserId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Context;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "storefront", version, about = "Storefront account and session client")]
struct Cli {
    /// Backend API base URL (overrides STOREFRONT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session file (overrides STOREFRONT_SESSION__FILE)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Ask the backend for a long-lived session
        #[arg(long)]
        remember_me: bool,
    },
    /// Clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Check whether an account exists for an email address
    CheckEmail { email: String },
    /// Request a password reset email
    ForgotPassword { email: String },
    /// Set a new six-digit password using a reset token
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        new_password: String,
        /// Defaults to --new-password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Confirm an email address
    ConfirmEmail {
        #[arg(long)]
        email: String,
        #[arg(long)]
        token: String,
    },
    /// Send the confirmation email again
    ResendConfirmation { email: String },
    /// Change the signed-in user's password
    ChangePassword {
        #[arg(long)]
        current_password: String,
        #[arg(long)]
        new_password: String,
        /// Defaults to --new-password
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Update the signed-in user's profile
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
    },
    /// Refresh the stored profile from the backend
    Reload,
    /// Update another user's account (Admin only)
    AdminUpdateUser {
        #[arg(value_parser = UserId::from_str)]
        id: UserId,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone_number: Option<String>,
        /// Deactivate the account
        #[arg(long)]
        inactive: bool,
        /// Role to grant; repeat for several
        #[arg(long = "role")]
        roles: Vec<String>,
    },
    /// Check whether navigating to a URL is allowed
    Guard {
        #[arg(value_enum)]
        kind: GuardArg,
        target: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GuardArg {
    /// Signed-in users
    Auth,
    /// Signed-in Admins
    Admin,
    /// Anonymous visitors
    Guest,
}

impl From<GuardArg> for GuardKind {
    fn from(arg: GuardArg) -> Self {
        match arg {
            GuardArg::Auth => Self::Auth,
            GuardArg::Admin => Self::Admin,
            GuardArg::Guest => Self::Guest,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::load(cli.api_url.as_deref(), cli.session_file)?;

    match cli.command {
        Commands::Login {
            email,
            password,
            remember_me,
        } => commands::login(&ctx, email, password, remember_me).await,
        Commands::Logout => commands::logout(&ctx),
        Commands::Whoami => commands::whoami(&ctx),
        Commands::Register {
            email,
            password,
            confirm_password,
            full_name,
        } => {
            let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            let form = RegisterForm {
                email,
                password,
                confirm_password,
                full_name,
            };
            commands::register(&ctx, form).await
        }
        Commands::CheckEmail { email } => commands::check_email(&ctx, &email).await,
        Commands::ForgotPassword { email } => commands::forgot_password(&ctx, &email).await,
        Commands::ResetPassword {
            email,
            token,
            new_password,
            confirm_password,
        } => {
            let confirm_password = confirm_password.unwrap_or_else(|| new_password.clone());
            let form = ResetPasswordForm {
                email,
                token,
                new_password,
                confirm_password,
            };
            commands::reset_password(&ctx, form).await
        }
        Commands::ConfirmEmail { email, token } => {
            commands::confirm_email(&ctx, ConfirmEmailForm { email, token }).await
        }
        Commands::ResendConfirmation { email } => {
            commands::resend_confirmation(&ctx, &email).await
        }
        Commands::ChangePassword {
            current_password,
            new_password,
            confirm_password,
        } => {
            let confirm_password = confirm_password.unwrap_or_else(|| new_password.clone());
            let form = ChangePasswordForm {
                current_password,
                new_password,
                confirm_password,
            };
            commands::change_password(&ctx, form).await
        }
        Commands::UpdateProfile {
            first_name,
            last_name,
            phone_number,
        } => {
            let patch = ProfilePatch {
                first_name,
                last_name,
                phone_number,
            };
            commands::update_profile(&ctx, patch).await
        }
        Commands::Reload => commands::reload(&ctx).await,
        Commands::AdminUpdateUser {
            id,
            first_name,
            last_name,
            phone_number,
            inactive,
            roles,
        } => {
            let update = AdminUserUpdate {
                first_name,
                last_name,
                phone_number,
                is_active: !inactive,
                roles,
            };
            commands::admin_update_user(&ctx, id, update).await
        }
        Commands::Guard { kind, target } => commands::guard(&ctx, kind.into(), &target),
    }
}
