//! Data Transfer Objects (DTOs) for requests and responses.
//!
//! Every OTP-guarded request is an operation payload flattened together with
//! the [`OtpFields`] handshake fields:
//!
//! ```json
//! { "name": "Asha", "ifsc": "HDFC0001234", "account_number": "50100012345678",
//!   "resend_otp": "Y", "retry_flag": "N", "otp": "", "txn_identifier": null }
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{OperationKind, OwnerId, TxnIdentifier};
use crate::error::DomainError;

/// Field-level validation applied after deserialization.
///
/// Deserialization enforces presence and enumerations; `validate` enforces
/// lengths, formats and cross-field rules.
pub trait Validate {
    fn validate(&self) -> Result<(), DomainError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// OTP handshake fields
// ─────────────────────────────────────────────────────────────────────────────

/// Two-valued wire flag, encoded as `"Y"` / `"N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    #[serde(alias = "y")]
    Y,
    #[serde(alias = "n")]
    N,
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        self == YesNo::Y
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value { YesNo::Y } else { YesNo::N }
    }
}

/// Handshake fields carried by every OTP-guarded request.
///
/// `resend_otp` and `retry_flag` have no default: a request without them
/// fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpFields {
    pub resend_otp: YesNo,
    pub retry_flag: YesNo,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub otp: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub txn_identifier: Option<String>,
}

impl OtpFields {
    /// Fields for an OTP issuance request.
    pub fn issue(resend_otp: bool) -> Self {
        Self {
            resend_otp: resend_otp.into(),
            retry_flag: YesNo::N,
            otp: None,
            txn_identifier: None,
        }
    }

    /// Fields for an OTP verification of an already issued identifier.
    pub fn confirm(txn_identifier: impl Into<String>, otp: impl Into<String>, retry: bool) -> Self {
        Self {
            resend_otp: YesNo::N,
            retry_flag: retry.into(),
            otp: Some(otp.into()),
            txn_identifier: Some(txn_identifier.into()),
        }
    }

    /// The echoed identifier, if any.
    pub fn identifier(&self) -> Result<Option<TxnIdentifier>, DomainError> {
        self.txn_identifier
            .as_deref()
            .map(TxnIdentifier::parse)
            .transpose()
    }
}

impl Validate for OtpFields {
    fn validate(&self) -> Result<(), DomainError> {
        if let Some(otp) = &self.otp {
            if self.resend_otp.is_yes() {
                return Err(invalid("resend_otp=Y cannot be combined with an otp"));
            }
            if !(4..=8).contains(&otp.len()) || !otp.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("otp must be 4-8 digits"));
            }
            if self.txn_identifier.is_none() {
                return Err(invalid("txn_identifier is required when submitting an otp"));
            }
        }
        self.identifier()?;
        Ok(())
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// An operation payload together with its handshake fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpGuarded<P> {
    #[serde(flatten)]
    pub payload: P,
    #[serde(flatten)]
    pub otp: OtpFields,
}

impl<P: Validate> Validate for OtpGuarded<P> {
    fn validate(&self) -> Result<(), DomainError> {
        self.payload.validate()?;
        self.otp.validate()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation payloads
// ─────────────────────────────────────────────────────────────────────────────

/// A typed payload for one operation kind.
pub trait OperationRequest: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    const KIND: OperationKind;

    fn into_payload(self) -> OperationPayload;
}

/// Register a beneficiary for IMPS/NEFT transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBeneficiary {
    pub name: String,
    pub ifsc: String,
    #[serde(alias = "account")]
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Validate for AddBeneficiary {
    fn validate(&self) -> Result<(), DomainError> {
        check_person_name("name", &self.name)?;
        check_ifsc(&self.ifsc)?;
        check_digits("account_number", &self.account_number, 9, 18)?;
        if let Some(confirm) = &self.confirm_account_number {
            if confirm != &self.account_number {
                return Err(invalid("confirm_account_number does not match account_number"));
            }
        }
        if let Some(nickname) = &self.nickname {
            check_len("nickname", nickname, 1, 30)?;
        }
        Ok(())
    }
}

/// Payment rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    Upi,
    Imps,
    Neft,
}

impl PaymentMode {
    /// Per-transaction ceiling in paise, if the rail has one.
    pub fn limit_paise(self) -> Option<i64> {
        match self {
            PaymentMode::Upi => Some(1_00_000 * 100),
            PaymentMode::Imps => Some(5_00_000 * 100),
            PaymentMode::Neft => None,
        }
    }
}

/// Move money to a VPA (UPI) or a bank account (IMPS/NEFT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub mode: PaymentMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_vpa: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifsc: Option<String>,
    /// Amount in paise.
    pub amount_paise: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Validate for Payment {
    fn validate(&self) -> Result<(), DomainError> {
        if self.amount_paise <= 0 {
            return Err(invalid("amount_paise must be positive"));
        }
        if let Some(limit) = self.mode.limit_paise() {
            if self.amount_paise > limit {
                return Err(invalid(format!(
                    "amount_paise exceeds the {:?} limit of {}",
                    self.mode, limit
                )));
            }
        }

        match self.mode {
            PaymentMode::Upi => {
                let vpa = self
                    .payee_vpa
                    .as_deref()
                    .ok_or_else(|| invalid("payee_vpa is required for UPI payments"))?;
                check_vpa(vpa)?;
            }
            PaymentMode::Imps | PaymentMode::Neft => {
                let account = self.beneficiary_account.as_deref().ok_or_else(|| {
                    invalid("beneficiary_account is required for IMPS/NEFT payments")
                })?;
                check_digits("beneficiary_account", account, 9, 18)?;
                let ifsc = self
                    .ifsc
                    .as_deref()
                    .ok_or_else(|| invalid("ifsc is required for IMPS/NEFT payments"))?;
                check_ifsc(ifsc)?;
            }
        }

        if let Some(remarks) = &self.remarks {
            check_len("remarks", remarks, 1, 50)?;
        }
        Ok(())
    }
}

/// Set the PIN of a newly issued debit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCardPin {
    pub card_last4: String,
    /// `MM/YY`
    pub expiry: String,
    /// ISO-9564 PIN block, hex encoded.
    pub pin_block: String,
}

impl Validate for SetCardPin {
    fn validate(&self) -> Result<(), DomainError> {
        check_card(&self.card_last4, &self.expiry)?;
        check_pin_block("pin_block", &self.pin_block)
    }
}

/// Reset a forgotten debit-card PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCardPin {
    pub card_last4: String,
    pub expiry: String,
    pub new_pin_block: String,
}

impl Validate for ResetCardPin {
    fn validate(&self) -> Result<(), DomainError> {
        check_card(&self.card_last4, &self.expiry)?;
        check_pin_block("new_pin_block", &self.new_pin_block)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    Lost,
    Stolen,
    Damaged,
    Temporary,
}

/// Block a debit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCard {
    pub card_last4: String,
    pub reason: BlockReason,
}

impl Validate for BlockCard {
    fn validate(&self) -> Result<(), DomainError> {
        check_digits("card_last4", &self.card_last4, 4, 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitChannel {
    Atm,
    Pos,
    Ecommerce,
    Contactless,
}

/// Enable/disable a card channel and set its daily limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLimit {
    pub card_last4: String,
    pub channel: LimitChannel,
    pub enabled: YesNo,
    /// Daily limit in paise. Required only when `enabled` is `Y`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_paise: Option<i64>,
}

impl Validate for ChangeLimit {
    fn validate(&self) -> Result<(), DomainError> {
        check_digits("card_last4", &self.card_last4, 4, 4)?;
        match (self.enabled, self.limit_paise) {
            (YesNo::Y, None) => Err(invalid("limit_paise is required when enabled=Y")),
            (YesNo::Y, Some(limit)) if limit <= 0 || limit > 5_00_000 * 100 => {
                Err(invalid("limit_paise must be between 1 and 50000000"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    Spouse,
    Son,
    Daughter,
    Father,
    Mother,
    Sibling,
    Other,
}

/// Register a nominee on a deposit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNominee {
    pub account_number: String,
    pub nominee_name: String,
    pub relationship: Relationship,
    pub date_of_birth: NaiveDate,
    /// Required only when the nominee is a minor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
}

impl AddNominee {
    /// Whether the nominee is under 18 on `today`.
    pub fn is_minor_on(&self, today: NaiveDate) -> bool {
        let mut age = today.year() - self.date_of_birth.year();
        if (today.month(), today.day()) < (self.date_of_birth.month(), self.date_of_birth.day()) {
            age -= 1;
        }
        age < 18
    }
}

impl Validate for AddNominee {
    fn validate(&self) -> Result<(), DomainError> {
        check_digits("account_number", &self.account_number, 9, 18)?;
        check_person_name("nominee_name", &self.nominee_name)?;

        let today = Utc::now().date_naive();
        if self.date_of_birth > today {
            return Err(invalid("date_of_birth cannot be in the future"));
        }
        match &self.guardian_name {
            None if self.is_minor_on(today) => {
                Err(invalid("guardian_name is required for a minor nominee"))
            }
            Some(guardian) => check_person_name("guardian_name", guardian),
            None => Ok(()),
        }
    }
}

/// Reset the mobile-banking PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetMpin {
    pub new_mpin_block: String,
    pub device_id: String,
}

impl Validate for ResetMpin {
    fn validate(&self) -> Result<(), DomainError> {
        check_pin_block("new_mpin_block", &self.new_mpin_block)?;
        check_len("device_id", &self.device_id, 8, 64)
    }
}

macro_rules! operation_requests {
    ($($ty:ident => $kind:ident),+ $(,)?) => {
        /// The closed set of OTP-guarded operation payloads.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "operation", content = "details", rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum OperationPayload {
            $($kind($ty),)+
        }

        impl OperationPayload {
            pub fn kind(&self) -> OperationKind {
                match self {
                    $(OperationPayload::$kind(_) => OperationKind::$kind,)+
                }
            }
        }

        impl Validate for OperationPayload {
            fn validate(&self) -> Result<(), DomainError> {
                match self {
                    $(OperationPayload::$kind(p) => p.validate(),)+
                }
            }
        }

        $(
            impl OperationRequest for $ty {
                const KIND: OperationKind = OperationKind::$kind;

                fn into_payload(self) -> OperationPayload {
                    OperationPayload::$kind(self)
                }
            }
        )+
    };
}

operation_requests! {
    AddBeneficiary => AddBeneficiary,
    Payment => Payment,
    SetCardPin => SetCardPin,
    ResetCardPin => ResetCardPin,
    BlockCard => BlockCard,
    ChangeLimit => ChangeLimit,
    AddNominee => AddNominee,
    ResetMpin => ResetMpin,
}

impl OperationPayload {
    /// SHA-256 (hex) of the canonical JSON of this payload.
    ///
    /// Binds a transaction identifier to one logical operation.
    pub fn digest(&self) -> String {
        let canonical = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
    }

    /// Operation-specific fields, as forwarded to the gateway.
    pub fn details(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("details").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Encrypted body: `{ "data": "<hex(nonce) || hex(ciphertext)>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    pub data: String,
}

/// Outcome of an OTP-guarded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    OtpSent,
    Completed,
}

/// Decrypted response of an OTP-guarded submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub txn_identifier: String,
    pub status: IntentStatus,
    pub operation: OperationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otp_destination: Option<String>,
}

/// Read model of a stored intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentView {
    pub txn_identifier: String,
    pub operation: OperationKind,
    pub state: String,
    pub otp_attempts: u32,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Admin request to enrol a device owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionOwnerRequest {
    pub label: String,
}

/// One-time enrolment response. The only place key material leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedOwner {
    pub owner_id: OwnerId,
    pub session_token: String,
    pub signing_key: String,
    pub key_version: u32,
}

/// One-time response after a key rotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotatedKey {
    pub owner_id: OwnerId,
    pub signing_key: String,
    pub key_version: u32,
}

/// Plaintext lookup of an IFSC code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfscLookupRequest {
    pub ifsc: String,
}

impl Validate for IfscLookupRequest {
    fn validate(&self) -> Result<(), DomainError> {
        check_ifsc(&self.ifsc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfscLookupResponse {
    pub ifsc: String,
    pub bank_code: String,
    pub branch_code: String,
}

/// Error body returned for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub code: u16,
}

// ─────────────────────────────────────────────────────────────────────────────
// Field checks
// ─────────────────────────────────────────────────────────────────────────────

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::ValidationError(msg.into())
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(invalid(format!(
            "{} must be {}-{} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn check_digits(field: &str, value: &str, min: usize, max: usize) -> Result<(), DomainError> {
    if value.len() < min || value.len() > max || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(if min == max {
            invalid(format!("{} must be {} digits", field, min))
        } else {
            invalid(format!("{} must be {}-{} digits", field, min, max))
        });
    }
    Ok(())
}

fn check_person_name(field: &str, value: &str) -> Result<(), DomainError> {
    check_len(field, value, 1, 100)?;
    if !value
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '\'')
    {
        return Err(invalid(format!("{} contains invalid characters", field)));
    }
    Ok(())
}

/// `AAAA0BBBBBB`: bank code, a literal zero, branch code.
fn check_ifsc(value: &str) -> Result<(), DomainError> {
    let bytes = value.as_bytes();
    let valid = bytes.len() == 11
        && bytes[..4].iter().all(|b| b.is_ascii_uppercase())
        && bytes[4] == b'0'
        && bytes[5..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if !valid {
        return Err(invalid("ifsc must look like ABCD0123456"));
    }
    Ok(())
}

fn check_vpa(value: &str) -> Result<(), DomainError> {
    let (handle, provider) = value
        .split_once('@')
        .ok_or_else(|| invalid("payee_vpa must look like handle@provider"))?;
    let handle_ok = (2..=256).contains(&handle.len())
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');
    let provider_ok = (2..=64).contains(&provider.len())
        && provider.chars().all(|c| c.is_ascii_alphanumeric());
    if !handle_ok || !provider_ok {
        return Err(invalid("payee_vpa must look like handle@provider"));
    }
    Ok(())
}

fn check_pin_block(field: &str, value: &str) -> Result<(), DomainError> {
    if value.len() != 16 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(format!("{} must be 16 hex characters", field)));
    }
    Ok(())
}

fn check_card(card_last4: &str, expiry: &str) -> Result<(), DomainError> {
    check_digits("card_last4", card_last4, 4, 4)?;
    let valid = match expiry.split_once('/') {
        Some((mm, yy)) => {
            mm.len() == 2
                && yy.len() == 2
                && yy.chars().all(|c| c.is_ascii_digit())
                && mm.parse::<u8>().is_ok_and(|m| (1..=12).contains(&m))
        }
        None => false,
    };
    if !valid {
        return Err(invalid("expiry must be MM/YY"));
    }
    Ok(())
}
