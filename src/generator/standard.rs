//! Consumer-webmail generation profile.
//!
//! Addresses look like real personal mailboxes (`sara.miller483@gmail.com`)
//! and messages imitate a consumer service's account-verification mail with a
//! six-digit OTP.

use chrono::{Datelike, Utc};
use rand::{rng, Rng};
use rand::seq::IndexedRandom;

use super::Synthesized;

const CONSUMER_DOMAIN: &str = "gmail.com";

const FIRST_NAMES: &[&str] = &[
    "john", "alex", "sara", "mike", "lisa", "david", "emma", "james", "sophia", "ryan",
    "robert", "jennifer", "michael", "jessica", "william", "amanda", "richard", "elizabeth",
    "thomas", "olivia", "charles", "emily", "daniel", "hannah", "matthew", "sarah",
];

const LAST_NAMES: &[&str] = &[
    "smith", "jones", "brown", "miller", "wilson", "taylor", "clark", "davis", "white", "moore",
    "anderson", "thomas", "jackson", "martin", "thompson", "williams", "johnson", "roberts",
    "robinson", "walker", "young", "allen", "king", "wright", "scott", "green",
];

/// Sender identities a verification mail can arrive from. The first word of
/// the display name doubles as the service name in subjects and bodies.
const PROVIDERS: &[(&str, &str)] = &[
    ("Nimbus Account Verification", "noreply@nimbus.dev"),
    ("Nimbus Security", "security@nimbus.dev"),
    ("Nimbus Auth", "auth@nimbus.dev"),
    ("Nimbus ID", "id@nimbus.dev"),
];

/// Body templates. `{OTP}` is replaced with the generated code and
/// `{SERVICE}` with the sending service's name.
const TEMPLATES: &[&str] = &[
    "Your {SERVICE} verification code is: {OTP}. Use this to verify your account.",
    "Welcome to {SERVICE}! Your verification code is {OTP}. This code expires in 10 minutes.",
    "Use code {OTP} to verify your {SERVICE} account. Don't share this code.",
    "Your {SERVICE} security code: {OTP}. Enter this to complete verification.",
    "Here's your {SERVICE} authentication code: {OTP}. Valid for 5 minutes.",
];

/// Compose a personal-looking address from the fixed name vocabularies.
///
/// One of eight candidate shapes is chosen uniformly per call — dotted,
/// fused, underscored, initial-based, with a 3-digit suffix, a birth year,
/// or a 2-digit current year. No uniqueness check happens here.
pub fn generate_address() -> String {
    let mut rng = rng();
    let first = *FIRST_NAMES.choose(&mut rng).expect("non-empty list");
    let last = *LAST_NAMES.choose(&mut rng).expect("non-empty list");

    let num = rng.random_range(100..1000);
    let birth_year = rng.random_range(1980..2005);
    let current_year = Utc::now().year() % 100;
    let first_initial = &first[..1];
    let last_initial = &last[..1];

    let candidates = [
        format!("{first}.{last}{num}@{CONSUMER_DOMAIN}"),
        format!("{first}{last}{num}@{CONSUMER_DOMAIN}"),
        format!("{first}{last}{birth_year}@{CONSUMER_DOMAIN}"),
        format!("{first}.{last}{birth_year}@{CONSUMER_DOMAIN}"),
        format!("{first_initial}{last}{num}@{CONSUMER_DOMAIN}"),
        format!("{first}_{last}{num}@{CONSUMER_DOMAIN}"),
        format!("{first}{last_initial}{birth_year}@{CONSUMER_DOMAIN}"),
        format!("{first}.{last}{current_year:02}@{CONSUMER_DOMAIN}"),
    ];

    candidates
        .choose(&mut rng)
        .expect("non-empty list")
        .clone()
}

/// Six decimal digits, never with a leading zero stripped.
fn generate_code() -> String {
    rng().random_range(100_000..1_000_000).to_string()
}

/// Fabricate one consumer verification message.
pub fn synthesize() -> Synthesized {
    let mut rng = rng();
    let (name, email) = *PROVIDERS.choose(&mut rng).expect("non-empty list");
    let template = *TEMPLATES.choose(&mut rng).expect("non-empty list");
    let code = generate_code();
    let service = name.split(' ').next().unwrap_or(name);

    let body = template.replace("{OTP}", &code).replace("{SERVICE}", service);

    Synthesized {
        sender: email.to_string(),
        sender_name: name.to_string(),
        subject: format!("{service} Verification Code"),
        body,
        code,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
