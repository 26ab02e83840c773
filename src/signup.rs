use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::api::ApiError;
use crate::data::AccountService;
use crate::model::User;

pub const MIN_LENGTH: usize = 4;
pub const MAX_ID_LENGTH: usize = 30;
pub const MAX_NAME_LENGTH: usize = 12;
pub const MAX_PASSWORD_LENGTH: usize = 20;

static ID_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9@._\-]").expect("valid id regex"));
static NAME_DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}_]").expect("valid name regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Id,
    Name,
    Password,
    PasswordConfirm,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Id, Field::Name, Field::Password, Field::PasswordConfirm];

    pub fn label(self) -> &'static str {
        match self {
            Field::Id => "Email",
            Field::Name => "Name",
            Field::Password => "Password",
            Field::PasswordConfirm => "Confirm password",
        }
    }

    pub fn max_length(self) -> usize {
        match self {
            Field::Id => MAX_ID_LENGTH,
            Field::Name => MAX_NAME_LENGTH,
            Field::Password | Field::PasswordConfirm => MAX_PASSWORD_LENGTH,
        }
    }

    pub fn is_secret(self) -> bool {
        matches!(self, Field::Password | Field::PasswordConfirm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupErrors {
    pub id: Option<&'static str>,
    pub name: Option<&'static str>,
    pub password: Option<&'static str>,
    pub password_confirm: Option<&'static str>,
}

impl SignupErrors {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.password.is_none()
            && self.password_confirm.is_none()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        match field {
            Field::Id => self.id,
            Field::Name => self.name,
            Field::Password => self.password,
            Field::PasswordConfirm => self.password_confirm,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignupError {
    #[error("please fix the highlighted fields")]
    Invalid(SignupErrors),
    #[error("that account already exists")]
    AlreadyExists,
    #[error(transparent)]
    Api(ApiError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub id: String,
    pub name: String,
    pub password: String,
    pub password_confirm: String,
}

impl SignupForm {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Name => &self.name,
            Field::Password => &self.password,
            Field::PasswordConfirm => &self.password_confirm,
        }
    }

    fn value_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Id => &mut self.id,
            Field::Name => &mut self.name,
            Field::Password => &mut self.password,
            Field::PasswordConfirm => &mut self.password_confirm,
        }
    }

    /// Appends a character unless the field is already at its cap.
    pub fn push(&mut self, field: Field, ch: char) {
        let value = self.value_mut(field);
        if value.chars().count() < field.max_length() {
            value.push(ch);
        }
    }

    pub fn pop(&mut self, field: Field) {
        self.value_mut(field).pop();
    }

    /// Replaces a field, cutting it to the field's cap.
    pub fn set(&mut self, field: Field, value: &str) {
        *self.value_mut(field) = value.chars().take(field.max_length()).collect();
    }

    /// Each field reports at most one message; later checks replace
    /// earlier ones.
    pub fn validate(&self) -> SignupErrors {
        let mut errors = SignupErrors::default();

        if self.id.chars().count() < MIN_LENGTH {
            errors.id = Some("email is too short");
        }
        if self.id.is_empty() {
            errors.id = Some("enter an email");
        }
        if ID_DISALLOWED.is_match(&self.id) {
            errors.id = Some("email contains characters that are not allowed");
        }

        if self.name.is_empty() {
            errors.name = Some("enter a name");
        }
        if NAME_DISALLOWED.is_match(&self.name) {
            errors.name = Some("name contains characters that are not allowed");
        }

        if self.password.chars().count() < MIN_LENGTH {
            errors.password = Some("password is too short");
        }
        if self.password.is_empty() {
            errors.password = Some("enter a password");
        }
        if self.password_confirm.is_empty() {
            errors.password_confirm = Some("confirm the password");
        }
        if self.password != self.password_confirm {
            errors.password_confirm = Some("passwords do not match");
        }

        errors
    }

    pub fn submit(&self, accounts: &dyn AccountService) -> Result<User, SignupError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(SignupError::Invalid(errors));
        }
        match accounts.signup(&self.id, &self.name, &self.password) {
            Ok(auth) => {
                info!(user = %auth.user.id, "account created");
                Ok(auth.user)
            }
            Err(err) if err.status() == Some(reqwest::StatusCode::BAD_REQUEST) => {
                Err(SignupError::AlreadyExists)
            }
            Err(err) => Err(SignupError::Api(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthResponse;
    use reqwest::StatusCode;

    fn filled() -> SignupForm {
        SignupForm {
            id: "eon@example.com".into(),
            name: "Eon".into(),
            password: "secret1".into(),
            password_confirm: "secret1".into(),
        }
    }

    struct FakeSignup(Option<StatusCode>);

    impl AccountService for FakeSignup {
        fn user(&self, _user_id: &str) -> Result<User, ApiError> {
            unreachable!()
        }

        fn auth_user(&self) -> Result<User, ApiError> {
            unreachable!()
        }

        fn update_user(&self, _full_name: &str, _username: &str) -> Result<User, ApiError> {
            unreachable!()
        }

        fn login(&self, _email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            unreachable!()
        }

        fn signup(&self, email: &str, full_name: &str, _password: &str) -> Result<AuthResponse, ApiError> {
            match self.0 {
                Some(status) => Err(ApiError::Status {
                    status,
                    body: String::new(),
                }),
                None => Ok(AuthResponse {
                    user: User {
                        id: "new".into(),
                        email: email.into(),
                        full_name: full_name.into(),
                        ..User::default()
                    },
                    token: "t".into(),
                }),
            }
        }

        fn logout(&self) -> Result<(), ApiError> {
            unreachable!()
        }
    }

    #[test]
    fn valid_form_has_no_errors() {
        assert!(filled().validate().is_empty());
    }

    #[test]
    fn empty_form_reports_every_field() {
        let errors = SignupForm::default().validate();
        assert_eq!(errors.id, Some("enter an email"));
        assert_eq!(errors.name, Some("enter a name"));
        assert_eq!(errors.password, Some("enter a password"));
        assert_eq!(errors.password_confirm, Some("confirm the password"));
    }

    #[test]
    fn later_rules_override_earlier_ones() {
        let mut form = filled();
        form.id = "a b".into();
        form.password = "abc".into();
        let errors = form.validate();
        assert_eq!(errors.id, Some("email contains characters that are not allowed"));
        assert_eq!(errors.password, Some("password is too short"));
        assert_eq!(errors.password_confirm, Some("passwords do not match"));
    }

    #[test]
    fn names_allow_letters_from_any_script() {
        let mut form = filled();
        form.name = "김동언".into();
        assert!(form.validate().name.is_none());
        form.name = "Eon!".into();
        assert!(form.validate().name.is_some());
    }

    #[test]
    fn input_is_capped() {
        let mut form = SignupForm::default();
        form.set(Field::Name, &"x".repeat(40));
        assert_eq!(form.name.chars().count(), MAX_NAME_LENGTH);
        form.push(Field::Name, 'y');
        assert_eq!(form.name.chars().count(), MAX_NAME_LENGTH);
        form.pop(Field::Name);
        form.push(Field::Name, 'y');
        assert!(form.name.ends_with('y'));
    }

    #[test]
    fn bad_request_means_account_exists() {
        let err = filled()
            .submit(&FakeSignup(Some(StatusCode::BAD_REQUEST)))
            .unwrap_err();
        assert!(matches!(err, SignupError::AlreadyExists));
        let err = filled()
            .submit(&FakeSignup(Some(StatusCode::INTERNAL_SERVER_ERROR)))
            .unwrap_err();
        assert!(matches!(err, SignupError::Api(_)));
    }

    #[test]
    fn invalid_form_never_reaches_backend() {
        let err = SignupForm::default().submit(&FakeSignup(None)).unwrap_err();
        assert!(matches!(err, SignupError::Invalid(_)));
        let user = filled().submit(&FakeSignup(None)).unwrap();
        assert_eq!(user.full_name, "Eon");
    }
}
