use serde::{Deserialize, Serialize};

/// A seat at the table. Credits persist across rounds; positions and
/// surplus live in the game state and are reset between driving rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Name of the registered AI policy driving this seat, `None` for a
    /// human player.
    pub ai_policy: Option<String>,
    credits: u32,
}

impl Player {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ai_policy: None,
            credits: 0,
        }
    }

    pub fn ai(name: impl Into<String>, policy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ai_policy: Some(policy.into()),
            credits: 0,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.ai_policy.is_some()
    }

    pub fn credits(&self) -> u32 {
        self.credits
    }

    pub fn add_credits(&mut self, amount: u32) {
        self.credits = self.credits.saturating_add(amount);
    }

    pub fn spend_credits(&mut self, amount: u32) -> Result<(), CreditError> {
        if self.credits < amount {
            return Err(CreditError::Insufficient {
                available: self.credits,
                requested: amount,
            });
        }
        self.credits -= amount;
        Ok(())
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        self.credits >= amount
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    #[error("insufficient credits: have {available}, need {requested}")]
    Insufficient { available: u32, requested: u32 },
}
