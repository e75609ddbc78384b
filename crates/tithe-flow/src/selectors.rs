//! Fixed remote endpoints and page markup identifiers
//!
//! These are a hard external dependency: the donations app and the Okta login
//! form are not ours, and any change to their markup or routing breaks the
//! driver. Kept in one place so a breakage is a one-file fix.

/// Okta authorize URL; doubles as the authenticated landing page probe
pub const AUTHORIZE_URL: &str = "https://id.churchofjesuschrist.org/oauth2/default/v1/authorize?scope=openid+profile+cmisid&sessionToken=&response_type=code&client_id=0oaxnk9mihwSrxIzV357&redirect_uri=https%3A%2F%2Fwww.churchofjesuschrist.org%2Fmy-home%2Fauth%2Fokta%2Fcallback&state=6336ce24-1948-4c4c-bb70-1cdec1eeb2ac";

/// Host of the identity provider; leaving it is the positive login signal
pub const IDENTITY_HOST: &str = "id.churchofjesuschrist.org";

/// First page of the donation workflow (amount entry)
pub const DONATION_START_URL: &str =
    "https://donations.churchofjesuschrist.org/donations/#/donation/step1";

/// Terminal thank-you page; confirmation requires an exact match
pub const THANK_YOU_URL: &str =
    "https://donations.churchofjesuschrist.org/donations/#/donation/thankyou";

/// Present on the landing page only when a session already exists
pub const PROFILE_MARKER: &str = "#profile";

/// Okta identity field (first login screen)
pub const USERNAME_INPUT: &str = "#input28";

/// Okta password field (second login screen)
pub const PASSWORD_INPUT: &str = "#input53";

/// Advances both Okta login screens
pub const LOGIN_SUBMIT: &str = "input.button-primary[type=\"submit\"]";

/// Renders only when Okta rejects the credentials
pub const LOGIN_ERROR_PANEL: &str = "div.okta-form-infobox-error.infobox.infobox-error";

/// Message text inside the error panel
pub const LOGIN_ERROR_TEXT: &str = "div.okta-form-infobox-error.infobox.infobox-error p";

/// Donation amount field on step 1
pub const AMOUNT_INPUT: &str = "input[name=\"txt\"]";

/// Advances steps 1 and 2
pub const NEXT_STEP: &str = "a[data-qa=\"nextStepButton\"]";

/// Next-step control, only when actually rendered visible
pub const NEXT_STEP_VISIBLE: &str = "a[data-qa=\"nextStepButton\"]:not(.display-hide)";

/// Final submit control on step 3
pub const SUBMIT: &str = "a[data-qa=\"submitButton\"]";

/// Rendered on the thank-you page
pub const CONFIRMATION_MARKER: &str = "h2[data-qa=\"confirmationText\"]";
