use chrono::NaiveDate;
use common::{storage::types::patient_submission::PatientSubmission, utils::config::AppConfig};
use serde::Deserialize;
use thiserror::Error;

const MAX_AGE: u8 = 150;
const MIN_ADDRESS_LEN: usize = 5;
const PHONE_DIGITS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeValidationError {
    #[error("Please enter patient full name")]
    MissingName,
    #[error("Patient name may only contain letters, spaces, hyphens and apostrophes")]
    InvalidName,
    #[error("Please enter a valid age ({min}-{max})")]
    InvalidAge { min: u8, max: u8 },
    #[error("Please select date of birth")]
    MissingDateOfBirth,
    #[error("Date of birth must be written as YYYY-MM-DD")]
    InvalidDateOfBirth,
    #[error("Date of birth cannot be in the future")]
    DateOfBirthInFuture,
    #[error("Date of birth cannot be before {0}")]
    DateOfBirthTooEarly(NaiveDate),
    #[error("Please enter patient address")]
    MissingAddress,
    #[error("Address must be at least {0} characters")]
    AddressTooShort(usize),
    #[error("Please enter phone number")]
    MissingPhone,
    #[error("Phone number must have {0} digits")]
    InvalidPhone(usize),
    #[error("Please upload at least one document")]
    NoDocuments,
}

/// Identity fields as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IntakeForm {
    pub full_name: String,
    pub age: String,
    pub date_of_birth: String,
    pub address: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeRules {
    pub min_age: u8,
    pub max_age: u8,
    pub earliest_birth_date: NaiveDate,
    pub min_address_len: usize,
    pub phone_digits: usize,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            min_age: 1,
            max_age: MAX_AGE,
            earliest_birth_date: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
            min_address_len: MIN_ADDRESS_LEN,
            phone_digits: PHONE_DIGITS,
        }
    }
}

impl IntakeRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_age: config.intake_min_age,
            ..Self::default()
        }
    }
}

/// Identity that passed validation, ready to become a submission record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidIdentity {
    pub full_name: String,
    pub age: u8,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub phone_number: String,
}

impl ValidIdentity {
    pub fn into_submission(self) -> PatientSubmission {
        PatientSubmission::new(
            self.full_name,
            self.age,
            self.date_of_birth,
            self.address,
            self.phone_number,
        )
    }
}

impl IntakeForm {
    /// Checks the fields in form order and reports the first rule that fails.
    pub fn validate(
        &self,
        rules: &IntakeRules,
        today: NaiveDate,
    ) -> Result<ValidIdentity, IntakeValidationError> {
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            return Err(IntakeValidationError::MissingName);
        }
        if !full_name.chars().all(is_name_char) {
            return Err(IntakeValidationError::InvalidName);
        }

        let invalid_age = IntakeValidationError::InvalidAge {
            min: rules.min_age,
            max: rules.max_age,
        };
        let age = self
            .age
            .trim()
            .parse::<u16>()
            .map_err(|_| invalid_age.clone())?;
        if age < u16::from(rules.min_age) || age > u16::from(rules.max_age) {
            return Err(invalid_age);
        }
        let age = u8::try_from(age).map_err(|_| invalid_age)?;

        let date_of_birth = self.date_of_birth.trim();
        if date_of_birth.is_empty() {
            return Err(IntakeValidationError::MissingDateOfBirth);
        }
        let date_of_birth = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d")
            .map_err(|_| IntakeValidationError::InvalidDateOfBirth)?;
        if date_of_birth > today {
            return Err(IntakeValidationError::DateOfBirthInFuture);
        }
        if date_of_birth < rules.earliest_birth_date {
            return Err(IntakeValidationError::DateOfBirthTooEarly(
                rules.earliest_birth_date,
            ));
        }

        let address = self.address.trim();
        if address.is_empty() {
            return Err(IntakeValidationError::MissingAddress);
        }
        if address.chars().count() < rules.min_address_len {
            return Err(IntakeValidationError::AddressTooShort(rules.min_address_len));
        }

        let phone = self.phone_number.trim();
        if phone.is_empty() {
            return Err(IntakeValidationError::MissingPhone);
        }
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let only_separators = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | ' ' | '(' | ')' | '.'));
        if digits != rules.phone_digits || !only_separators {
            return Err(IntakeValidationError::InvalidPhone(rules.phone_digits));
        }

        Ok(ValidIdentity {
            full_name: full_name.to_string(),
            age,
            date_of_birth,
            address: address.to_string(),
            phone_number: format_phone_number(phone),
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '\u{2019}')
}

/// Formats the digits of `value` as `555-123-4567`, dropping empty groups while the
/// number is being typed. Input with more than ten digits is returned unchanged.
pub fn format_phone_number(value: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > PHONE_DIGITS {
        return value.to_string();
    }

    let (area, rest) = digits.split_at(digits.len().min(3));
    let (exchange, line) = rest.split_at(rest.len().min(3));
    [area, exchange, line]
        .into_iter()
        .filter(|group| !group.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
