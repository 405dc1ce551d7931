use chrono::NaiveDate;
use once_cell::sync::Lazy;
use profile_database::file_storage::get_valid_name;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Stored form of a profile. One per owner, keyed by `user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: u64,                          // owner id, primary key
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub phone_number: String,               // normalized, blank when unset
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub image: Option<String>,              // storage-relative name, not a URL
}

impl UserProfile {
    pub fn new(user: u64) -> Self {
        Self {
            user,
            date_of_birth: None,
            phone_number: String::new(),
            gender: Gender::default(),
            image: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "U")]
    Unknown,
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Unknown, Gender::Male, Gender::Female];

    pub fn code(&self) -> &'static str {
        match self {
            Gender::Unknown => "U",
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Unknown => "unknown",
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|gender| gender.code() == code)
    }
}

static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{6,14}$").expect("phone number pattern is valid"));

/// Strips common separators and checks what is left looks like an
/// international number. Blank input stays blank.
pub fn normalize_phone_number(raw: &str) -> Option<String> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if compact.is_empty() {
        return Some(compact);
    }

    PHONE_NUMBER.is_match(&compact).then_some(compact)
}

/// Storage name for a newly uploaded profile image.
pub fn upload_to(user: u64, filename: &str) -> String {
    format!("{}{}", upload_dir(user), get_valid_name(filename))
}

/// Whether `name` was written by an upload for `user`. Anything else may be
/// shared with other profiles and is never removed on their behalf.
pub fn owns_upload(user: u64, name: &str) -> bool {
    name.strip_prefix(&upload_dir(user))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}

fn upload_dir(user: u64) -> String {
    format!("profiles/{}/", user)
}
