use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use surety_core::{DomainError, DomainResult, Entity, WalletAddress};
use surety_risk::{RiskScore, WorkerHistory};

/// Participant role. Fixed once a user record exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Worker,
    Employer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Worker => "WORKER",
            Role::Employer => "EMPLOYER",
            Role::Admin => "ADMIN",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WORKER" => Ok(Role::Worker),
            "EMPLOYER" => Ok(Role::Employer),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(DomainError::validation(format!("unknown role: {s}"))),
        }
    }
}

/// A participant, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub wallet_address: WalletAddress,
    pub role: Role,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub current_risk_score: RiskScore,
    pub total_jobs_completed: u32,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = WalletAddress;

    fn id(&self) -> &Self::Id {
        &self.wallet_address
    }
}

impl User {
    /// A fresh user with no history.
    pub fn new(wallet_address: WalletAddress, role: Role, created_at: DateTime<Utc>) -> Self {
        Self {
            wallet_address,
            role,
            phone_number: None,
            email: None,
            current_risk_score: RiskScore::MIN,
            total_jobs_completed: 0,
            created_at,
        }
    }

    pub fn with_contact(mut self, phone_number: Option<String>, email: Option<String>) -> Self {
        self.phone_number = phone_number;
        self.email = email;
        self
    }

    /// Reject any attempt to re-register the user under another role.
    pub fn ensure_role(&self, requested: Role) -> DomainResult<()> {
        if self.role != requested {
            return Err(DomainError::conflict(format!(
                "user {} is already registered as {}; role cannot change to {}",
                self.wallet_address, self.role, requested
            )));
        }
        Ok(())
    }

    /// Count one more completed job. Never decreases.
    pub fn record_completion(&mut self) -> u32 {
        self.total_jobs_completed = self.total_jobs_completed.saturating_add(1);
        self.total_jobs_completed
    }

    pub fn history(&self) -> WorkerHistory {
        WorkerHistory::new(self.total_jobs_completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> User {
        User::new(WalletAddress::parse("W1").unwrap(), Role::Worker, Utc::now())
    }

    #[test]
    fn new_user_has_no_history() {
        let user = worker();
        assert_eq!(user.total_jobs_completed, 0);
        assert_eq!(user.current_risk_score, RiskScore::MIN);
        assert_eq!(user.history(), WorkerHistory::new(0));
    }

    #[test]
    fn role_change_is_a_conflict() {
        let user = worker();
        assert!(user.ensure_role(Role::Worker).is_ok());
        assert!(matches!(
            user.ensure_role(Role::Employer),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn completions_accumulate() {
        let mut user = worker();
        assert_eq!(user.record_completion(), 1);
        assert_eq!(user.record_completion(), 2);
        assert_eq!(user.history().jobs_completed, 2);
    }

    #[test]
    fn completion_count_saturates() {
        let mut user = worker();
        user.total_jobs_completed = u32::MAX;
        assert_eq!(user.record_completion(), u32::MAX);
    }

    #[test]
    fn role_parses_and_displays() {
        assert_eq!("employer".parse::<Role>().unwrap(), Role::Employer);
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert!("OWNER".parse::<Role>().is_err());
    }
}
