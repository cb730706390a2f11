//! Sign-in, sign-up and sign-out commands.

use secrecy::SecretString;
use tienda_client::{SignIn, SignUp, Storefront};
use tienda_core::SessionStatus;

use super::CliError;
use crate::output;

/// Sign in and persist the credential.
pub async fn login(
    storefront: &Storefront,
    email: String,
    password: String,
    captcha: Option<String>,
) -> Result<(), CliError> {
    let session = storefront.session();
    session.restore().await;

    let form = SignIn {
        email,
        password: SecretString::from(password),
        captcha,
    };
    if session.sign_in(&form).await != SessionStatus::Authenticated {
        return Err(CliError::from_notices(session.notices(), "Could not sign in"));
    }

    output::signed_in(&session.snapshot());
    Ok(())
}

/// Create an account and sign in as it.
pub async fn register(
    storefront: &Storefront,
    name: String,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let session = storefront.session();
    session.restore().await;

    let form = SignUp {
        name,
        email,
        password: SecretString::from(password),
    };
    if session.sign_up(&form).await != SessionStatus::Authenticated {
        return Err(CliError::from_notices(
            session.notices(),
            "Could not create the account",
        ));
    }

    output::signed_in(&session.snapshot());
    Ok(())
}

/// Sign out. Always succeeds locally.
pub async fn logout(storefront: &Storefront) -> Result<(), CliError> {
    let session = storefront.session();
    session.restore().await;
    session.sign_out().await;
    output::line("Signed out");
    Ok(())
}

/// Show the restored identity.
pub async fn whoami(storefront: &Storefront) -> Result<(), CliError> {
    let session = storefront.session();
    session.restore().await;
    output::whoami(&session.snapshot());
    Ok(())
}
