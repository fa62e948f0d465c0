//! Form validation
//!
//! Request bodies arrive as loosely typed forms. Each form has a `clean`
//! method that checks everything that can be checked without the database and
//! produces the typed input the repositories accept. Services add the checks
//! that need a lookup (existence, uniqueness) to the same [`FormErrors`].

use crate::models::{
    CategoryInput, CreateUserInput, LocationInput, PostInput, UpdateProfileInput, TITLE_MAX_LEN,
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of usernames and name fields
pub const NAME_MAX_LEN: usize = 150;

/// Maximum length of an image reference
pub const IMAGE_MAX_LEN: usize = 255;

/// Maximum length of category titles, slugs and location names
pub const LABEL_MAX_LEN: usize = 256;

/// Minimum password length
pub const PASSWORD_MIN_LEN: usize = 8;

const REQUIRED: &str = "This field is required.";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"));

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for a single failing field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Merge another set of messages into this one
    pub fn extend(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when nothing failed
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn required_text(errors: &mut FormErrors, field: &str, value: Option<String>) -> String {
    let value = value.unwrap_or_default();
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
    value
}

fn max_len(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    if char_len(value) > max {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters.", max),
        );
    }
}

/// Check a username against length and character rules
pub fn check_username(errors: &mut FormErrors, username: &str) {
    if username.is_empty() {
        errors.add("username", REQUIRED);
        return;
    }
    max_len(errors, "username", username, NAME_MAX_LEN);
    if !USERNAME_RE.is_match(username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

/// Check an optional email address
pub fn check_email(errors: &mut FormErrors, email: &str) {
    if email.is_empty() {
        return;
    }
    max_len(errors, "email", email, 254);
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(' '),
        None => false,
    };
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}

fn check_password(errors: &mut FormErrors, password: &str, confirm: &str) {
    if password.is_empty() {
        errors.add("password", REQUIRED);
        return;
    }
    if char_len(password) < PASSWORD_MIN_LEN {
        errors.add(
            "password",
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LEN
            ),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password", "This password is entirely numeric.");
    }
    if password != confirm {
        errors.add("password_confirm", "The two password fields didn't match.");
    }
}

fn parse_pub_date(errors: &mut FormErrors, value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value.unwrap_or_default();
    if value.trim().is_empty() {
        errors.add("pub_date", REQUIRED);
        return None;
    }
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(_) => {
            errors.add("pub_date", "Enter a valid date/time.");
            None
        }
    }
}

/// Post create/edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: Option<String>,
    pub text: Option<String>,
    /// RFC 3339 timestamp
    pub pub_date: Option<String>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
    pub image: Option<String>,
    pub is_published: Option<bool>,
}

impl PostForm {
    pub fn clean(self) -> Result<PostInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required_text(&mut errors, "title", self.title);
        max_len(&mut errors, "title", &title, TITLE_MAX_LEN);
        let text = required_text(&mut errors, "text", self.text);
        let pub_date = parse_pub_date(&mut errors, self.pub_date);

        let image = self.image.filter(|image| !image.trim().is_empty());
        if let Some(image) = &image {
            max_len(&mut errors, "image", image, IMAGE_MAX_LEN);
        }

        match pub_date {
            Some(pub_date) if errors.is_empty() => Ok(PostInput {
                title,
                text,
                pub_date,
                category_id: self.category_id,
                location_id: self.location_id,
                image,
                is_published: self.is_published.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }
}

/// Comment add/edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: Option<String>,
}

impl CommentForm {
    pub fn clean(self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required_text(&mut errors, "text", self.text);
        errors.into_result(text)
    }
}

/// Profile edit form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl ProfileForm {
    pub fn clean(self) -> Result<UpdateProfileInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.unwrap_or_default().trim().to_string();
        check_username(&mut errors, &username);
        let first_name = self.first_name.unwrap_or_default().trim().to_string();
        max_len(&mut errors, "first_name", &first_name, NAME_MAX_LEN);
        let last_name = self.last_name.unwrap_or_default().trim().to_string();
        max_len(&mut errors, "last_name", &last_name, NAME_MAX_LEN);
        let email = self.email.unwrap_or_default().trim().to_string();
        check_email(&mut errors, &email);

        errors.into_result(UpdateProfileInput {
            username,
            first_name,
            last_name,
            email,
        })
    }
}

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

impl RegistrationForm {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        password_confirm: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
            password_confirm: Some(password_confirm.into()),
        }
    }

    pub fn clean(self) -> Result<CreateUserInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.unwrap_or_default().trim().to_string();
        check_username(&mut errors, &username);
        let email = self.email.unwrap_or_default().trim().to_string();
        check_email(&mut errors, &email);
        let password = self.password.unwrap_or_default();
        let password_confirm = self.password_confirm.unwrap_or_default();
        check_password(&mut errors, &password, &password_confirm);

        errors.into_result(CreateUserInput {
            username,
            email,
            password,
            password_confirm,
        })
    }
}

/// Category admin form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub is_published: Option<bool>,
}

impl CategoryForm {
    pub fn clean(self) -> Result<CategoryInput, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required_text(&mut errors, "title", self.title).trim().to_string();
        max_len(&mut errors, "title", &title, LABEL_MAX_LEN);
        let slug = self.slug.unwrap_or_default().trim().to_string();
        if slug.is_empty() {
            errors.add("slug", REQUIRED);
        } else {
            max_len(&mut errors, "slug", &slug, 64);
            if !SLUG_RE.is_match(&slug) {
                errors.add(
                    "slug",
                    "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
                );
            }
        }

        errors.into_result(
            CategoryInput::new(title, slug)
                .with_description(self.description.unwrap_or_default())
                .with_published(self.is_published.unwrap_or(true)),
        )
    }
}

/// Location admin form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocationForm {
    pub name: Option<String>,
    pub is_published: Option<bool>,
}

impl LocationForm {
    pub fn clean(self) -> Result<LocationInput, FormErrors> {
        let mut errors = FormErrors::new();

        let name = required_text(&mut errors, "name", self.name).trim().to_string();
        max_len(&mut errors, "name", &name, LABEL_MAX_LEN);

        errors.into_result(
            LocationInput::new(name).with_published(self.is_published.unwrap_or(true)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post_form() -> PostForm {
        PostForm {
            title: Some("Title".to_string()),
            text: Some("Body".to_string()),
            pub_date: Some("2024-05-01T12:00:00+03:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_post_form_defaults_to_published() {
        let input = post_form().clean().expect("form should be valid");

        assert!(input.is_published);
        assert_eq!(input.pub_date.to_rfc3339(), "2024-05-01T09:00:00+00:00");
        assert_eq!(input.image, None);
    }

    #[test]
    fn test_post_form_reports_every_field() {
        let errors = PostForm::default().clean().unwrap_err();

        assert!(errors.has("title"));
        assert!(errors.has("text"));
        assert!(errors.has("pub_date"));
    }

    #[test]
    fn test_post_form_title_limit() {
        let mut form = post_form();
        form.title = Some("x".repeat(TITLE_MAX_LEN));
        assert!(form.clone().clean().is_ok());

        form.title = Some("x".repeat(TITLE_MAX_LEN + 1));
        assert!(form.clean().unwrap_err().has("title"));
    }

    #[test]
    fn test_post_form_bad_date() {
        let mut form = post_form();
        form.pub_date = Some("yesterday".to_string());
        let errors = form.clean().unwrap_err();

        assert_eq!(errors.field("pub_date"), Some(&["Enter a valid date/time.".to_string()][..]));
    }

    #[test]
    fn test_comment_form_requires_text() {
        assert!(CommentForm { text: Some("  ".to_string()) }.clean().is_err());
        assert_eq!(
            CommentForm { text: Some("Nice".to_string()) }.clean().unwrap(),
            "Nice"
        );
    }

    #[test]
    fn test_registration_password_rules() {
        let errors = RegistrationForm::new("leo", "", "12345678", "12345678")
            .clean()
            .unwrap_err();
        assert!(errors.has("password"));

        let errors = RegistrationForm::new("leo", "", "short", "short").clean().unwrap_err();
        assert!(errors.has("password"));

        let errors = RegistrationForm::new("leo", "", "long enough", "long enougH")
            .clean()
            .unwrap_err();
        assert!(errors.has("password_confirm"));
        assert!(!errors.has("password"));

        assert!(RegistrationForm::new("leo", "leo@example.com", "war and peace", "war and peace")
            .clean()
            .is_ok());
    }

    #[test]
    fn test_profile_form_checks_username_and_email() {
        let errors = ProfileForm {
            username: Some("bad name!".to_string()),
            email: Some("nowhere".to_string()),
            ..Default::default()
        }
        .clean()
        .unwrap_err();

        assert!(errors.has("username"));
        assert!(errors.has("email"));

        let input = ProfileForm {
            username: Some("new.name".to_string()),
            first_name: Some(" Leo ".to_string()),
            ..Default::default()
        }
        .clean()
        .unwrap();
        assert_eq!(input.first_name, "Leo");
        assert_eq!(input.email, "");
    }

    #[test]
    fn test_category_form_slug_pattern() {
        let form = CategoryForm {
            title: Some("Travel".to_string()),
            slug: Some("travel notes".to_string()),
            ..Default::default()
        };
        assert!(form.clean().unwrap_err().has("slug"));

        let input = CategoryForm {
            title: Some("Travel".to_string()),
            slug: Some("travel-notes_2".to_string()),
            is_published: Some(false),
            ..Default::default()
        }
        .clean()
        .unwrap();
        assert!(!input.is_published);
    }

    #[test]
    fn test_location_form() {
        assert!(LocationForm::default().clean().unwrap_err().has("name"));
        assert_eq!(
            LocationForm {
                name: Some("Moscow".to_string()),
                is_published: None
            }
            .clean()
            .unwrap()
            .name,
            "Moscow"
        );
    }

    #[test]
    fn test_form_errors_serialize_as_map() {
        let mut errors = FormErrors::single("title", "too long");
        errors.add("title", "still too long");
        let json = serde_json::to_value(&errors).unwrap();

        assert_eq!(json, serde_json::json!({"title": ["too long", "still too long"]}));
    }

    #[test]
    fn test_form_errors_extend_merges_fields() {
        let mut errors = FormErrors::single("category_id", "Select a valid choice.");
        let mut more = FormErrors::single("title", REQUIRED);
        more.add("category_id", "other");
        errors.extend(more);

        assert!(errors.has("title"));
        assert_eq!(errors.field("category_id").map(<[String]>::len), Some(2));
    }

    proptest! {
        #[test]
        fn valid_usernames_pass(name in "[a-zA-Z0-9_.@+-]{1,150}") {
            let mut errors = FormErrors::new();
            check_username(&mut errors, &name);
            prop_assert!(errors.is_empty());
        }

        #[test]
        fn usernames_with_spaces_fail(left in "[a-z]{1,10}", right in "[a-z]{1,10}") {
            let mut errors = FormErrors::new();
            check_username(&mut errors, &format!("{} {}", left, right));
            prop_assert!(errors.has("username"));
        }
    }
}
