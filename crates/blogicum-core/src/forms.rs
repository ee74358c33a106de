//! Form validation.
//!
//! Every form is a plain struct deserialized from a submitted body. `clean`
//! returns either the cleaned values or a [`FormErrors`] map that the caller
//! renders back next to the form. Whitespace around text inputs is trimmed
//! while deserializing; passwords are taken verbatim.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::{Comment, Post, User};

/// Key under which errors not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_DATETIME: &str = "Enter a valid date/time.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Field name → messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::new();

        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| error.code.to_string());
                form_errors.add(field.to_string(), message);
            }
        }

        form_errors
    }
}

fn validation_errors(form: &impl Validate) -> FormErrors {
    form.validate().err().map(FormErrors::from).unwrap_or_default()
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some(REQUIRED.into());
        return Err(error);
    }

    Ok(())
}

fn valid_username(username: &str) -> Result<(), ValidationError> {
    required(username)?;

    if username
        .chars()
        .any(|c| !(c.is_alphanumeric() || "@.+-_".contains(c)))
    {
        let mut error = ValidationError::new("invalid_username");
        error.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        return Err(error);
    }

    Ok(())
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Accepts RFC 3339, the HTML `datetime-local` format (with or without
/// seconds, `T` or space separated) and a bare date meaning midnight UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_choice(value: &str, field: &str, errors: &mut FormErrors) -> Option<i64> {
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(field, INVALID_CHOICE);
            None
        }
    }
}

/// Post form: `pub_date`, `title`, `text`, `location`, `category`, `image`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "required"))]
    pub pub_date: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        custom(function = "required"),
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "required"))]
    pub text: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "required"))]
    pub category: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub image: Option<String>,
}

/// Cleaned post form values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub pub_date: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub location_id: Option<i64>,
    pub category_id: i64,
    pub image: Option<String>,
}

impl PostForm {
    /// The form bound to an existing post.
    pub fn from_post(post: &Post) -> Self {
        Self {
            pub_date: post.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
            title: post.title.clone(),
            text: post.text.clone(),
            location: post.location_id.map(|id| id.to_string()),
            category: post.category_id.to_string(),
            image: post.image.clone(),
        }
    }

    pub fn clean(&self) -> Result<PostDraft, FormErrors> {
        let mut errors = validation_errors(self);

        let pub_date = if self.pub_date.is_empty() {
            None
        } else {
            let parsed = parse_datetime(&self.pub_date);
            if parsed.is_none() {
                errors.add("pub_date", INVALID_DATETIME);
            }
            parsed
        };

        let category_id = if self.category.is_empty() {
            None
        } else {
            parse_choice(&self.category, "category", &mut errors)
        };

        let location_id = self
            .location
            .as_deref()
            .and_then(|value| parse_choice(value, "location", &mut errors));

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(PostDraft {
                pub_date,
                title: self.title.clone(),
                text: self.text.clone(),
                location_id,
                category_id,
                image: self.image.clone(),
            }),
            _ => Err(errors),
        }
    }
}

impl PostDraft {
    /// A new post written by `author_id`.
    pub fn into_post(self, author_id: i64) -> Post {
        let mut post = Post::new(
            author_id,
            self.category_id,
            self.title.clone(),
            self.text.clone(),
            self.pub_date,
        );
        self.apply(&mut post);
        post
    }

    /// Copy the editable fields onto an existing post.
    pub fn apply(self, post: &mut Post) {
        post.pub_date = self.pub_date;
        post.title = self.title;
        post.text = self.text;
        post.location_id = self.location_id;
        post.category_id = self.category_id;
        post.image = self.image;
    }
}

/// Profile form: `last_name`, `first_name`, `username`, `email`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        custom(function = "valid_username"),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            last_name: user.last_name.clone(),
            first_name: user.first_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    /// Uniqueness of the username is checked by the caller against the store.
    pub fn clean(&self) -> Result<(), FormErrors> {
        let errors = validation_errors(self);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn apply(&self, user: &mut User) {
        user.last_name = self.last_name.clone();
        user.first_name = self.first_name.clone();
        user.username = self.username.clone();
        user.email = self.email.clone();
        user.updated_at = Utc::now();
    }
}

/// Comment form: `text`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "required"))]
    pub text: String,
}

impl CommentForm {
    pub fn from_comment(comment: &Comment) -> Self {
        Self {
            text: comment.text.clone(),
        }
    }

    pub fn clean(&self) -> Result<String, FormErrors> {
        let errors = validation_errors(self);
        if errors.is_empty() {
            Ok(self.text.clone())
        } else {
            Err(errors)
        }
    }
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(
        custom(function = "valid_username"),
        length(max = 150, message = "Ensure this value has at most 150 characters.")
    )]
    pub username: String,
    #[serde(deserialize_with = "blank_as_none")]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[serde(skip_serializing)]
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(skip_serializing)]
    #[validate(must_match(
        other = "password1",
        message = "The two password fields didn't match."
    ))]
    pub password2: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let errors = validation_errors(self);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Log-in form.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(custom(function = "required"))]
    pub username: String,
    #[serde(skip_serializing)]
    #[validate(custom(function = "required"))]
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let errors = validation_errors(self);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
