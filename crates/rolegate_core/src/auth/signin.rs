//! Wallet sign-in links.

use url::Url;

/// Build the deep link that hands a session token to the wallet.
///
/// The wallet calls `{public_url}/start-session` for a nonce and
/// `{public_url}/authenticate` with the signature, then redirects the user to
/// `{public_url}/success`.
pub fn signin_url(signin_base: &str, public_url: &str, token: &str) -> Result<Url, url::ParseError> {
    let public_url = public_url.trim_end_matches('/');
    let callback = format!("{}/success", public_url);
    let nonce_endpoint = format!("{}/start-session", public_url);
    let authentication_endpoint = format!("{}/authenticate", public_url);
    let favicon = format!("{}/favicon.ico", public_url);

    Url::parse_with_params(
        signin_base,
        &[
            ("token", token),
            ("callback_url", callback.as_str()),
            ("nonce_endpoint", nonce_endpoint.as_str()),
            ("authentication_endpoint", authentication_endpoint.as_str()),
            ("favicon_url", favicon.as_str()),
        ],
    )
}
