//! Command handlers.

use std::path::PathBuf;
use std::sync::Arc;
use storefront_auth::{
    AdminUserUpdate, AuthGateway, ChangePasswordForm, ClientConfig, ConfirmEmailForm, FileStorage,
    Flow, GuardDecision, GuardKind, HttpAuthApi, LoginForm, ProfilePatch, RegisterForm,
    ResetPasswordForm, SessionStatus, SessionStore, UserProfile,
};
use storefront_core::{Result, UserId};

use crate::error::CliError;

/// Loaded configuration plus the session it points at.
pub struct Context {
    config: ClientConfig,
    session: Arc<SessionStore>,
}

impl Context {
    /// Loads configuration from the environment and opens the session file.
    pub fn load(api_url: Option<&str>, session_file: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config =
            ClientConfig::from_env(api_url).map_err(|e| CliError::Config {
                details: e.to_string(),
            })?;
        if let Some(path) = session_file {
            config = config.with_session_file(path);
        }
        Ok(Self::new(config))
    }

    pub fn new(config: ClientConfig) -> Self {
        let path = config.session().file();
        tracing::debug!(path = %path.display(), "opening session file");
        let session = Arc::new(SessionStore::with_expiry_enforcement(
            FileStorage::new(path),
            config.session().enforce_expiry(),
        ));
        Self { config, session }
    }

    fn gateway(&self) -> Result<AuthGateway<HttpAuthApi>, CliError> {
        self.config
            .require_api_url()
            .map_err(|_| CliError::Config {
                details: "no API URL configured; set STOREFRONT_API_URL or pass --api-url"
                    .to_string(),
            })?;
        let api = HttpAuthApi::from_config(&self.config).map_err(|e| CliError::Client {
            details: e.to_string(),
        })?;
        Ok(AuthGateway::new(api, Arc::clone(&self.session)))
    }
}

fn describe(user: &UserProfile) -> String {
    let name = user.full_name();
    let role = if user.is_admin() { "admin" } else { "customer" };
    if name.is_empty() {
        format!("{} ({role})", user.email())
    } else {
        format!("{name} <{}> ({role})", user.email())
    }
}

pub async fn login(ctx: &Context, email: String, password: String, remember_me: bool) -> Result<(), CliError> {
    let gateway = ctx.gateway()?;
    let mut form = LoginForm::new(email, password);
    form.remember_me = remember_me;
    let user = gateway
        .login(&form)
        .await
        .map_err(|e| CliError::auth(Flow::Login, &e))?;
    println!("Signed in as {}", describe(&user));
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<(), CliError> {
    ctx.session.logout().map_err(CliError::from)?;
    println!("Signed out");
    Ok(())
}

pub fn whoami(ctx: &Context) -> Result<(), CliError> {
    match ctx.session.inspect() {
        SessionStatus::Active(active) => {
            let user = active.user();
            println!("{}", describe(user));
            println!("id: {}", user.id());
            let roles: Vec<&str> = user.roles().iter().collect();
            if !roles.is_empty() {
                println!("roles: {}", roles.join(", "));
            }
            if let Some(expires) = active.claims().expires_at() {
                println!("token expires: {}", expires.to_rfc3339());
            }
        }
        SessionStatus::Anonymous => println!("Not signed in"),
        SessionStatus::Expired => {
            ctx.session.logout().map_err(CliError::from)?;
            println!("Session expired; signed out");
        }
        SessionStatus::Invalid(error) => {
            tracing::warn!(%error, "stored token is unusable");
            ctx.session.logout().map_err(CliError::from)?;
            println!("Stored session was invalid; signed out");
        }
    }
    Ok(())
}

pub async fn register(ctx: &Context, form: RegisterForm) -> Result<(), CliError> {
    let message = ctx
        .gateway()?
        .register(&form)
        .await
        .map_err(|e| CliError::auth(Flow::Register, &e))?;
    println!("{message}");
    Ok(())
}

pub async fn check_email(ctx: &Context, email: &str) -> Result<(), CliError> {
    let exists = ctx
        .gateway()?
        .check_email_status(email)
        .await
        .map_err(|e| CliError::auth(Flow::CheckEmail, &e))?;
    if exists {
        println!("An account exists for {email}");
    } else {
        println!("No account exists for {email}");
    }
    Ok(())
}

pub async fn forgot_password(ctx: &Context, email: &str) -> Result<(), CliError> {
    let message = ctx
        .gateway()?
        .forgot_password(email)
        .await
        .map_err(|e| CliError::auth(Flow::ForgotPassword, &e))?;
    println!("{message}");
    Ok(())
}

pub async fn reset_password(ctx: &Context, form: ResetPasswordForm) -> Result<(), CliError> {
    let message = ctx
        .gateway()?
        .reset_password(&form)
        .await
        .map_err(|e| CliError::auth(Flow::ResetPassword, &e))?;
    println!("{message}");
    Ok(())
}

pub async fn confirm_email(ctx: &Context, form: ConfirmEmailForm) -> Result<(), CliError> {
    let message = ctx
        .gateway()?
        .confirm_email(&form)
        .await
        .map_err(|e| CliError::auth(Flow::ConfirmEmail, &e))?;
    println!("{message}");
    Ok(())
}

pub async fn resend_confirmation(ctx: &Context, email: &str) -> Result<(), CliError> {
    let message = ctx
        .gateway()?
        .resend_confirmation(email)
        .await
        .map_err(|e| CliError::auth(Flow::ResendConfirmation, &e))?;
    println!("{message}");
    Ok(())
}

pub async fn change_password(ctx: &Context, form: ChangePasswordForm) -> Result<(), CliError> {
    ctx.gateway()?
        .change_password(&form)
        .await
        .map_err(|e| CliError::auth(Flow::ChangePassword, &e))?;
    println!("Password changed");
    Ok(())
}

pub async fn update_profile(ctx: &Context, patch: ProfilePatch) -> Result<(), CliError> {
    let user = ctx
        .gateway()?
        .update_profile(&patch)
        .await
        .map_err(|e| CliError::auth(Flow::UpdateProfile, &e))?;
    println!("Profile updated: {}", describe(&user));
    Ok(())
}

pub async fn reload(ctx: &Context) -> Result<(), CliError> {
    let user = ctx
        .gateway()?
        .reload_user()
        .await
        .map_err(|e| CliError::auth(Flow::ReloadUser, &e))?;
    println!("{}", describe(&user));
    Ok(())
}

pub async fn admin_update_user(ctx: &Context, id: UserId, update: AdminUserUpdate) -> Result<(), CliError> {
    ctx.gateway()?
        .admin_update_user(&id, &update)
        .await
        .map_err(|e| CliError::auth(Flow::AdminUpdateUser, &e))?;
    println!("User {id} updated");
    Ok(())
}

/// Prints `allow` or fails with the redirect location.
pub fn guard(ctx: &Context, kind: GuardKind, target: &str) -> Result<(), CliError> {
    match kind.check(ctx.config.guards(), &ctx.session, target) {
        GuardDecision::Allow => {
            println!("allow");
            Ok(())
        }
        GuardDecision::Redirect(redirect) => Err(CliError::Redirected {
            location: redirect.to_url(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::RoleSet;

    fn context(dir: &tempfile::TempDir) -> Context {
        Context::new(ClientConfig::new("").with_session_file(dir.path().join("session.json")))
    }

    // `{"alg":"none"}.{"sub":"u-1"}.sig`
    const TOKEN: &str = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJ1LTEifQ.sig";

    #[test]
    fn guard_redirects_anonymous_to_login() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir);
        let err = guard(&ctx, GuardKind::Admin, "/admin/dashboard").unwrap_err();
        assert!(
            err.to_string()
                .contains("redirect to /login?returnUrl=%2Fadmin%2Fdashboard")
        );
    }

    #[test]
    fn guard_allows_stored_admin_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir);
        let admin = UserProfile::new(UserId::new("u-1"), "admin@shop.test").with_roles(RoleSet::admin());
        ctx.session.set_session(TOKEN, &admin).expect("set");

        assert!(guard(&ctx, GuardKind::Admin, "/admin/dashboard").is_ok());
        assert!(guard(&ctx, GuardKind::Guest, "/login").is_err());
    }

    #[test]
    fn logout_and_whoami_work_without_api_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir);
        let user = UserProfile::new(UserId::new("u-1"), "a@b.com");
        ctx.session.set_session(TOKEN, &user).expect("set");

        whoami(&ctx).expect("whoami");
        logout(&ctx).expect("logout");
        assert!(!ctx.session.is_authenticated());
    }

    #[tokio::test]
    async fn network_commands_require_api_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(&dir);
        let err = reload(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("no API URL configured"));
    }

    #[test]
    fn describe_includes_role() {
        let user = UserProfile::new(UserId::new("u-1"), "a@b.com").with_names("Cora", "Customer");
        assert_eq!(describe(&user), "Cora Customer <a@b.com> (customer)");
    }
}
