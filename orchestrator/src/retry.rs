use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Cómo crece la espera entre intentos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Siempre `delay`
    Fixed,
    /// `delay * factor^(n-1)`, con tope `max_delay`
    Exponential { factor: u32, max_delay: Duration },
}

/// Política de reintentos, igual para split, cada map y el reduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Intentos totales (no reintentos)
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Espera después del intento `failed_attempt` (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor, max_delay } => {
                let exp = failed_attempt.saturating_sub(1);
                let grown = self.delay.saturating_mul(factor.max(1).saturating_pow(exp));
                grown.min(max_delay)
            }
        }
    }

    /// Latencia agregada si fallan todos los intentos (sólo esperas).
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts)
            .map(|n| self.delay_after(n))
            .sum()
    }
}
