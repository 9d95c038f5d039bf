//! Form validation for registration, login, password changes and uploads.
//!
//! Each validator collects every failing field instead of stopping at the
//! first one. A missing required value stops the remaining checks for that
//! field only.

use std::collections::BTreeSet;

use email_address::EmailAddress;
use serde::Serialize;
use thiserror::Error;

use brocat_db::Database;
use brocat_types::api::{ChangePasswordRequest, LoginRequest, RegisterRequest};

pub const USERNAME_MAX_CHARS: usize = 16;
pub const TITLE_MAX_CHARS: usize = 100;
pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    MissingField,
    FormatError,
    DuplicateEmail,
    DuplicateUsername,
    MissingFile,
    DisallowedExtension,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: ValidationKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize)]
#[error("Validation failed on {} field(s)", .errors.len())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn has(&self, kind: ValidationKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub(crate) fn push(&mut self, field: &'static str, kind: ValidationKind, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            kind,
            message: message.into(),
        });
    }

    pub(crate) fn into_result(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() { Ok(()) } else { Err(self) }
    }
}

// -- Allow-lists --

/// Case-insensitive file extension allow-list for one upload field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedExtensions {
    allowed: BTreeSet<String>,
    message: String,
}

impl AllowedExtensions {
    pub const DEFAULT_MESSAGE: &'static str = "This file extension is not allowed.";

    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self {
            allowed,
            message: Self::DEFAULT_MESSAGE.to_string(),
        }
    }

    /// Parse a comma-separated list such as `"png, .JPG,gif"`.
    pub fn parse_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Base message followed by the permitted extensions.
    pub fn message(&self) -> String {
        let allowed: Vec<&str> = self.allowed.iter().map(String::as_str).collect();
        format!("{} Use {} instead.", self.message, allowed.join(", "))
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.allowed.contains(&extension.to_ascii_lowercase())
    }

    /// Returns the lower-cased extension of `filename` when it is allowed.
    pub fn check(&self, filename: &str) -> Result<String, String> {
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return Err(self.message());
        };
        let ext = ext.to_ascii_lowercase();
        if self.allowed.contains(&ext) { Ok(ext) } else { Err(self.message()) }
    }
}

/// Independent allow-lists for the thumbnail and audio fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub images: AllowedExtensions,
    pub audios: AllowedExtensions,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            images: AllowedExtensions::new(["png", "jpg", "jpeg", "gif"]),
            audios: AllowedExtensions::new(["mp3", "wav", "ogg"]),
        }
    }
}

// -- Registration --

/// Lookup seam for the uniqueness checks.
pub trait AccountDirectory {
    fn email_taken(&self, email: &str) -> anyhow::Result<bool>;
    fn username_taken(&self, username: &str) -> anyhow::Result<bool>;
}

impl AccountDirectory for Database {
    fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        self.email_exists(email)
    }

    fn username_taken(&self, username: &str) -> anyhow::Result<bool> {
        self.username_exists(username)
    }
}

/// The outer error is a failed uniqueness lookup; the inner one carries
/// the field errors, as with the other validators.
pub fn validate_registration(
    directory: &impl AccountDirectory,
    req: &RegisterRequest,
) -> anyhow::Result<Result<(), ValidationError>> {
    let mut errors = ValidationError::default();

    if req.email.is_empty() {
        errors.push("email", ValidationKind::MissingField, "E-mail field is required.");
    } else {
        if EmailAddress::parse_with_options(&req.email, Default::default()).is_err() {
            errors.push("email", ValidationKind::FormatError, "Invalid e-mail address.");
        }
        if !has_basic_email_shape(&req.email) {
            errors.push(
                "email",
                ValidationKind::FormatError,
                "Use this format your e-mail address someone@example.com.",
            );
        }
        if directory.email_taken(&req.email)? {
            errors.push("email", ValidationKind::DuplicateEmail, "Email already exists");
        }
    }

    if req.username.is_empty() {
        errors.push("username", ValidationKind::MissingField, "Username field is required");
    } else {
        if req.username.chars().count() > USERNAME_MAX_CHARS {
            errors.push(
                "username",
                ValidationKind::FormatError,
                "The username must be less or equal to 16 characters.",
            );
        }
        if directory.username_taken(&req.username)? {
            errors.push("username", ValidationKind::DuplicateUsername, "Username already exists");
        }
    }

    check_new_password(&mut errors, "password", &req.password, "confirm_password", &req.confirm_password);

    Ok(errors.into_result())
}

/// `local@domain.tld`, matched as a prefix: something without `@`, an `@`,
/// then a domain part containing a dot followed by at least two letters.
fn has_basic_email_shape(email: &str) -> bool {
    let Some((local, rest)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }

    let domain = rest.split('@').next().unwrap_or_default();
    domain.char_indices().any(|(i, c)| {
        c == '.'
            && i > 0
            && domain[i + 1..].chars().take(2).filter(char::is_ascii_alphabetic).count() == 2
    })
}

/// Letters and digits only, at least one of each, at least six long.
pub fn password_meets_rules(password: &str) -> bool {
    password.len() >= PASSWORD_MIN_CHARS
        && password.chars().all(|c| c.is_ascii_alphanumeric())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_alphabetic())
}

fn check_new_password(
    errors: &mut ValidationError,
    field: &'static str,
    password: &str,
    confirm_field: &'static str,
    confirm: &str,
) {
    if password.is_empty() {
        errors.push(field, ValidationKind::MissingField, "Password field is required.");
    } else {
        if password != confirm {
            errors.push(field, ValidationKind::FormatError, "Passwords must match.");
        }
        if !password_meets_rules(password) {
            errors.push(
                field,
                ValidationKind::FormatError,
                "Password must contain at least one letter, at least one number, and be at least six characters long.",
            );
        }
    }

    if confirm.is_empty() {
        errors.push(confirm_field, ValidationKind::MissingField, "Confirm your password.");
    }
}

// -- Login / password change --

pub fn validate_login(req: &LoginRequest) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if req.username.is_empty() {
        errors.push("username", ValidationKind::MissingField, "Username field is required");
    }
    if req.password.is_empty() {
        errors.push("password", ValidationKind::MissingField, "Password field is required.");
    }
    errors.into_result()
}

pub fn validate_password_change(req: &ChangePasswordRequest) -> Result<(), ValidationError> {
    let mut errors = ValidationError::default();
    if req.current_password.is_empty() {
        errors.push("current_password", ValidationKind::MissingField, "Current password is required.");
    }
    check_new_password(&mut errors, "new_password", &req.new_password, "confirm_password", &req.confirm_password);
    errors.into_result()
}

// -- Upload --

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub thumbnail: Option<UploadedFile>,
    pub audio: Option<UploadedFile>,
    pub description: String,
}

/// Lower-cased extensions of an accepted upload, used to name the stored files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadExtensions {
    pub thumbnail: String,
    pub audio: String,
}

pub fn validate_upload(form: &UploadForm, config: &UploadConfig) -> Result<UploadExtensions, ValidationError> {
    let mut errors = ValidationError::default();

    if form.title.is_empty() {
        errors.push("title", ValidationKind::MissingField, "The Brocat needs a title!");
    } else if form.title.chars().count() > TITLE_MAX_CHARS {
        errors.push("title", ValidationKind::FormatError, "100 is the maximum characters for a title");
    }

    let thumbnail = check_file(
        &mut errors,
        "thumbnail",
        form.thumbnail.as_ref(),
        &config.images,
        "We need an awesome thumbnail!",
    );
    let audio = check_file(&mut errors, "audio", form.audio.as_ref(), &config.audios, "We need your Brocat here!");

    match (thumbnail, audio) {
        (Some(thumbnail), Some(audio)) if errors.errors.is_empty() => Ok(UploadExtensions { thumbnail, audio }),
        _ => Err(errors),
    }
}

fn check_file(
    errors: &mut ValidationError,
    field: &'static str,
    file: Option<&UploadedFile>,
    allowed: &AllowedExtensions,
    missing_message: &str,
) -> Option<String> {
    let Some(file) = file.filter(|f| !f.filename.is_empty() && !f.bytes.is_empty()) else {
        errors.push(field, ValidationKind::MissingFile, missing_message);
        return None;
    };

    match allowed.check(&file.filename) {
        Ok(ext) => Some(ext),
        Err(message) => {
            errors.push(field, ValidationKind::DisallowedExtension, message);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brocat_db::models::NewUser;

    fn register(email: &str, username: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }


    fn file(name: &str) -> Option<UploadedFile> {
        Some(UploadedFile {
            filename: name.into(),
            bytes: vec![1, 2, 3],
        })
    }

    fn upload(thumbnail: &str, audio: &str) -> UploadForm {
        UploadForm {
            title: "Purring".into(),
            thumbnail: file(thumbnail),
            audio: file(audio),
            description: String::new(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        let db = Database::open_in_memory().unwrap();
        validate_registration(&db, &register("tom@example.com", "tom", "abc123", "abc123"))
            .unwrap()
            .unwrap();
    }

    #[test]
    fn duplicate_email_and_username() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&NewUser::new("tom@example.com", "tom", "abc123").unwrap()).unwrap();

        let errors = validate_registration(&db, &register("tom@example.com", "tommy", "abc123", "abc123"))
            .unwrap()
            .unwrap_err();
        assert!(errors.has(ValidationKind::DuplicateEmail));
        assert!(!errors.has(ValidationKind::DuplicateUsername));

        let errors = validate_registration(&db, &register("tommy@example.com", "tom", "abc123", "abc123"))
            .unwrap()
            .unwrap_err();
        assert!(errors.has(ValidationKind::DuplicateUsername));
        assert!(!errors.has(ValidationKind::DuplicateEmail));
    }

    #[test]
    fn long_username_is_format_error() {
        let db = Database::open_in_memory().unwrap();
        let errors = validate_registration(&db, &register("tom@example.com", "thisnameiswaytoolong17", "abc123", "abc123"))
            .unwrap()
            .unwrap_err();
        let username: Vec<_> = errors.for_field("username").collect();
        assert_eq!(username.len(), 1);
        assert_eq!(username[0].kind, ValidationKind::FormatError);

        validate_registration(&db, &register("tom@example.com", "sixteencharsname", "abc123", "abc123"))
            .unwrap()
            .unwrap();
    }

    #[test]
    fn password_rules() {
        assert!(!password_meets_rules("abcdef"));
        assert!(!password_meets_rules("123456"));
        assert!(!password_meets_rules("ab12"));
        assert!(!password_meets_rules("abc 123"));
        assert!(password_meets_rules("abc123"));

        let db = Database::open_in_memory().unwrap();
        let errors = validate_registration(&db, &register("tom@example.com", "tom", "abcdef", "abcdef"))
            .unwrap()
            .unwrap_err();
        assert!(errors.has(ValidationKind::FormatError));
        validate_registration(&db, &register("tom@example.com", "tom", "abc123", "abc123"))
            .unwrap()
            .unwrap();
    }

    #[test]
    fn mismatched_confirmation() {
        let db = Database::open_in_memory().unwrap();
        let errors = validate_registration(&db, &register("tom@example.com", "tom", "abc123", "abc124"))
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.errors.len(), 1);
        assert_eq!(errors.errors[0].message, "Passwords must match.");
    }

    #[test]
    fn empty_fields_are_missing() {
        let db = Database::open_in_memory().unwrap();
        let errors = validate_registration(&db, &RegisterRequest::default())
            .unwrap()
            .unwrap_err();
        assert_eq!(errors.errors.len(), 4);
        assert!(errors.errors.iter().all(|e| e.kind == ValidationKind::MissingField));
    }

    #[test]
    fn email_shape() {
        assert!(has_basic_email_shape("someone@example.com"));
        assert!(!has_basic_email_shape("someone@example"));
        assert!(!has_basic_email_shape("@example.com"));
        assert!(!has_basic_email_shape("someone@.com"));
        assert!(!has_basic_email_shape("someone@example.c"));

        let db = Database::open_in_memory().unwrap();
        let errors = validate_registration(&db, &register("not-an-email", "tom", "abc123", "abc123"))
            .unwrap()
            .unwrap_err();
        assert!(errors.for_field("email").all(|e| e.kind == ValidationKind::FormatError));
        assert!(errors.for_field("email").count() >= 1);
    }

    #[test]
    fn login_requires_both_fields() {
        let errors = validate_login(&LoginRequest::default()).unwrap_err();
        assert_eq!(errors.errors.len(), 2);

        validate_login(&LoginRequest {
            username: "tom".into(),
            password: "x".into(),
            remember: false,
        })
        .unwrap();
    }

    #[test]
    fn password_change_uses_registration_rules() {
        let errors = validate_password_change(&ChangePasswordRequest {
            current_password: "abc123".into(),
            new_password: "letters".into(),
            confirm_password: "letters".into(),
        })
        .unwrap_err();
        assert!(errors.for_field("new_password").any(|e| e.kind == ValidationKind::FormatError));
    }

    #[test]
    fn allow_list_normalizes_entries() {
        let list = AllowedExtensions::parse_list(" PNG, .jpg ,,");
        assert!(list.contains("png"));
        assert!(list.contains("JPG"));
        assert_eq!(list.check("Cat.PNG"), Ok("png".to_string()));
        assert!(list.check("cat").is_err());
        assert!(list.check("cat.").is_err());
        assert_eq!(list.message(), "This file extension is not allowed. Use jpg, png instead.");

        let custom = list.with_message("Nope.");
        assert_eq!(custom.message(), "Nope. Use jpg, png instead.");
    }

    #[test]
    fn disallowed_thumbnail_lists_permitted_extensions() {
        let config = UploadConfig {
            images: AllowedExtensions::new(["png", "jpg"]),
            audios: AllowedExtensions::new(["mp3", "wav"]),
        };

        let errors = validate_upload(&upload("a.gif", "song.mp3"), &config).unwrap_err();
        let thumb: Vec<_> = errors.for_field("thumbnail").collect();
        assert_eq!(thumb.len(), 1);
        assert_eq!(thumb[0].kind, ValidationKind::DisallowedExtension);
        assert!(thumb[0].message.contains("jpg, png"));
        assert_eq!(errors.for_field("audio").count(), 0);
    }

    #[test]
    fn valid_upload_reports_extensions() {
        let config = UploadConfig {
            images: AllowedExtensions::new(["png", "jpg"]),
            audios: AllowedExtensions::new(["mp3", "wav"]),
        };

        let exts = validate_upload(&upload("cat.JPG", "song.mp3"), &config).unwrap();
        assert_eq!(exts.thumbnail, "jpg");
        assert_eq!(exts.audio, "mp3");
    }

    #[test]
    fn missing_files_and_title() {
        let errors = validate_upload(&UploadForm::default(), &UploadConfig::default()).unwrap_err();
        assert_eq!(errors.for_field("title").next().unwrap().kind, ValidationKind::MissingField);
        assert_eq!(errors.for_field("thumbnail").next().unwrap().kind, ValidationKind::MissingFile);
        assert_eq!(errors.for_field("audio").next().unwrap().kind, ValidationKind::MissingFile);

        let mut form = upload("a.png", "b.mp3");
        form.title = "x".repeat(101);
        let errors = validate_upload(&form, &UploadConfig::default()).unwrap_err();
        assert!(errors.has(ValidationKind::FormatError));
    }
}
