use regex::Regex;
use std::sync::OnceLock;

use crate::domain::agistment::PLACEHOLDER_NAME;
use crate::domain::field_group::{
    CareGroup, ContactInfo, Description, FacilityGroup, FieldGroup, Header, LocationInfo,
    PaddockGroup, PhotoGroup, RidingGroup, ServiceGroup,
};
use crate::domain::photos::MAX_PHOTOS;
use crate::domain::value_objects::FieldErrors;

const MIN_NAME_LEN: usize = 3;
const PHONE_DIGITS: usize = 10;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

// ─── Field rules ──────────────────────────────────────────────────────────────

/// Listing names need three characters and must not be the placeholder.
pub fn validate_listing_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        Some(format!("Name must be at least {MIN_NAME_LEN} characters"))
    } else if name == PLACEHOLDER_NAME {
        Some("Please give your agistment a name".to_string())
    } else {
        None
    }
}

/// Contact names only need the length check.
pub fn validate_contact_name(name: &str) -> Option<String> {
    (name.trim().chars().count() < MIN_NAME_LEN)
        .then(|| format!("Name must be at least {MIN_NAME_LEN} characters"))
}

pub fn validate_email(email: &str) -> Option<String> {
    (!email_regex().is_match(email.trim()))
        .then(|| "Please enter a valid email address".to_string())
}

/// Ten digits; spaces are ignored so "0412 345 678" passes.
pub fn validate_phone(number: &str) -> Option<String> {
    let compact: String = number.chars().filter(|c| !c.is_whitespace()).collect();
    let ok = compact.len() == PHONE_DIGITS && compact.chars().all(|c| c.is_ascii_digit());
    (!ok).then(|| format!("Phone number must be exactly {PHONE_DIGITS} digits"))
}

// ─── Group validators ─────────────────────────────────────────────────────────

pub fn header_validator(header: &Header) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check("name", validate_listing_name(&header.name));
    errors
}

pub fn contact_validator(contact: &ContactInfo) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.check("name", validate_contact_name(&contact.0.name));
    errors.check("email", validate_email(&contact.0.email));
    errors.check("number", validate_phone(&contact.0.number));
    errors
}

/// A paddock kind cannot have more free paddocks than it has paddocks.
pub fn paddock_validator(paddocks: &PaddockGroup) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for (field, kind) in paddocks.0.kinds() {
        if kind.available > kind.total_paddocks {
            errors.insert(
                field,
                format!(
                    "Available paddocks ({}) cannot exceed total paddocks ({})",
                    kind.available, kind.total_paddocks
                ),
            );
        }
    }
    errors
}

pub fn photo_validator(photos: &PhotoGroup) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if photos.photos.len() > MAX_PHOTOS {
        errors.insert("photos", format!("At most {MAX_PHOTOS} photos are allowed"));
    } else if photos.photos.iter().any(|p| p.link.trim().is_empty()) {
        errors.insert("photos", "Every photo needs a link");
    }
    errors
}

// ─── Built-in rules per group ─────────────────────────────────────────────────

/// The validation a field group gets by default.
pub trait GroupRules: FieldGroup {
    fn rules(&self) -> FieldErrors {
        FieldErrors::new()
    }
}

impl GroupRules for Header {
    fn rules(&self) -> FieldErrors {
        header_validator(self)
    }
}

impl GroupRules for ContactInfo {
    fn rules(&self) -> FieldErrors {
        contact_validator(self)
    }
}

impl GroupRules for PaddockGroup {
    fn rules(&self) -> FieldErrors {
        paddock_validator(self)
    }
}

impl GroupRules for PhotoGroup {
    fn rules(&self) -> FieldErrors {
        photo_validator(self)
    }
}

impl GroupRules for Description {}
impl GroupRules for LocationInfo {}
impl GroupRules for FacilityGroup {}
impl GroupRules for RidingGroup {}
impl GroupRules for CareGroup {}
impl GroupRules for ServiceGroup {}

/// Validator running a group's built-in rules.
pub fn group_rules<G: GroupRules>(group: &G) -> FieldErrors {
    group.rules()
}
