//! Corporate single-sign-on generation profile.
//!
//! Addresses imitate enterprise identity-provider accounts
//! (`employee48213@sso.company.org`) and messages imitate SSO verification
//! mail. Codes come in several formats — numeric, alphanumeric, and dashed —
//! because that is what real SSO systems send.

use rand::{rng, Rng};
use rand::seq::IndexedRandom;

use super::Synthesized;

/// Identity providers: display name + mail domain.
const PROVIDERS: &[(&str, &str)] = &[
    ("Corporate SSO", "sso.company.org"),
    ("Enterprise ID", "id.enterprise.com"),
    ("Secure Access", "access.secure-login.net"),
    ("Identity Suite", "identity.suite.io"),
    ("Single Sign On", "auth.single-sign-on.com"),
];

/// Body templates with a `{CODE}` placeholder.
const TEMPLATES: &[&str] = &[
    "Your SSO verification code is {CODE}. Enter this code to complete your single sign-on authentication.",
    "Use verification code {CODE} to authorize SSO login to your account. This code will expire in 5 minutes.",
    "SSO Authentication Required: Your verification code is {CODE}. Do not share this code with anyone.",
    "SAML SSO Verification: Enter code {CODE} to complete your authentication process.",
    "To continue with SSO login, enter security code: {CODE}. This is a one-time verification code.",
];

const GIVEN_NAMES: &[&str] = &[
    "john", "sara", "michael", "emma", "david", "jennifer", "robert", "lisa",
];
const SURNAMES: &[&str] = &[
    "smith", "johnson", "williams", "jones", "brown", "davis", "miller", "wilson",
];
const ROLES: &[&str] = &[
    "developer", "admin", "manager", "user", "support", "sales", "finance", "hr",
];
const DEPARTMENTS: &[&str] = &[
    "it", "hr", "dev", "sales", "support", "marketing", "finance", "admin",
];
const ID_PREFIXES: &[&str] = &["id", "sso", "user", "auth", "login", "account"];

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Compose a corporate-looking address.
///
/// The local part comes from one of five independent sub-generators chosen
/// uniformly (name-based, role-based, department+number, id-prefix+number,
/// employee-id); the domain is uniform over the fixed provider list.
pub fn generate_address() -> String {
    let mut rng = rng();
    let (_, domain) = *PROVIDERS.choose(&mut rng).expect("non-empty list");

    let prefix = match rng.random_range(0..5) {
        0 => {
            let name = GIVEN_NAMES.choose(&mut rng).expect("non-empty list");
            let surname = SURNAMES.choose(&mut rng).expect("non-empty list");
            format!("{name}.{surname}")
        }
        1 => ROLES.choose(&mut rng).expect("non-empty list").to_string(),
        2 => {
            let dept = DEPARTMENTS.choose(&mut rng).expect("non-empty list");
            format!("{dept}{}", rng.random_range(100..1000))
        }
        3 => {
            let id_prefix = ID_PREFIXES.choose(&mut rng).expect("non-empty list");
            format!("{id_prefix}.{}", rng.random_range(1000..10_000))
        }
        _ => format!("employee{}", rng.random_range(10_000..100_000)),
    };

    format!("{prefix}@{domain}")
}

fn alphanumeric(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| *CODE_CHARS.choose(rng).expect("non-empty list") as char)
        .collect()
}

/// Verification code in one of four formats chosen uniformly:
/// 6-digit numeric, 8-digit numeric, 6-char alphanumeric, or dashed XXX-XXX.
fn generate_code() -> String {
    let mut rng = rng();
    match rng.random_range(0..4) {
        0 => rng.random_range(100_000..1_000_000).to_string(),
        1 => rng.random_range(10_000_000..100_000_000u64).to_string(),
        2 => alphanumeric(&mut rng, 6),
        _ => format!("{}-{}", alphanumeric(&mut rng, 3), alphanumeric(&mut rng, 3)),
    }
}

/// Fabricate one SSO verification message.
pub fn synthesize() -> Synthesized {
    let mut rng = rng();
    let (name, domain) = *PROVIDERS.choose(&mut rng).expect("non-empty list");
    let template = *TEMPLATES.choose(&mut rng).expect("non-empty list");
    let code = generate_code();

    Synthesized {
        sender: format!("verification@{domain}"),
        sender_name: format!("{name} Authentication"),
        subject: "SSO Verification Code".to_string(),
        body: template.replace("{CODE}", &code),
        code,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
