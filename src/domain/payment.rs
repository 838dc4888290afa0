use crate::domain::user::Role;
use crate::error::{AcademyError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A positive amount in major currency units (naira).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(AcademyError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The amount in the provider's minor unit (kobo), rounded to the nearest unit.
    pub fn minor_units(&self) -> Result<i64> {
        (self.0 * dec!(100))
            .round()
            .to_i64()
            .ok_or_else(|| AcademyError::ValidationError("Amount is too large".to_string()))
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AcademyError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Pricing plan chosen at checkout.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Full,
    /// First instalment of the two-part plan.
    Deposit,
}

impl Plan {
    pub fn price(self) -> Amount {
        match self {
            Plan::Full => Amount(dec!(30000)),
            Plan::Deposit => Amount(dec!(20000)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Full => "full",
            Plan::Deposit => "deposit",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Failed)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ngn,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Card,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentProviderKind {
    Paystack,
    Sandbox,
}

/// Transaction status as reported by the payment provider.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Success,
    Failed,
    /// Anything not yet settled: pending, ongoing, abandoned, queued...
    #[serde(other)]
    Pending,
}

/// One attempted transaction, keyed by its provider reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub provider: PaymentProviderKind,
    pub reference: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(
        profile_id: Uuid,
        amount: Amount,
        provider: PaymentProviderKind,
        reference: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile_id,
            amount,
            currency: Currency::Ngn,
            status: PaymentStatus::Pending,
            method: PaymentMethod::Card,
            provider,
            reference: reference.into(),
            receipt_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The state a payment and its owner move to after a provider report.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Transition {
    pub status: PaymentStatus,
    pub role: Role,
}

/// Decides how a provider report changes local state.
///
/// Returns `None` when nothing must be written. Settled payments never
/// change again, so a second confirmation of the same reference is a no-op.
pub fn apply_provider_status(
    current: PaymentStatus,
    role: Role,
    reported: ProviderStatus,
) -> Option<Transition> {
    match (current, reported) {
        (PaymentStatus::Pending, ProviderStatus::Success) => Some(Transition {
            status: PaymentStatus::Paid,
            role: role.on_payment(),
        }),
        (PaymentStatus::Pending, ProviderStatus::Failed) => Some(Transition {
            status: PaymentStatus::Failed,
            role,
        }),
        (PaymentStatus::Pending, ProviderStatus::Pending) => None,
        (PaymentStatus::Paid | PaymentStatus::Failed, _) => None,
    }
}
