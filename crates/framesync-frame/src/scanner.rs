use framesync_transport::ByteTransport;
use tracing::{debug, warn};

use crate::error::Result;
use crate::marker::{Preamble, TokenWatch};
use crate::reader::read_window;

/// Default number of non-matching windows tolerated before reporting a sync
/// timeout.
pub const DEFAULT_RETRY_BUDGET: usize = 100;

/// When the receiver goes looking for the preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Every frame is preceded by the preamble; each cycle re-enters
    /// preamble search.
    #[default]
    PerFrame,
    /// The preamble opens the session only; frames follow back to back.
    PerSession,
}

/// Bounded count of consecutive failed match attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    limit: usize,
    spent: usize,
}

impl RetryBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            spent: 0,
        }
    }

    /// Count one failed attempt. Returns true once the budget is used up.
    pub fn spend(&mut self) -> bool {
        self.spent += 1;
        self.spent >= self.limit
    }

    pub fn reset(&mut self) {
        self.spent = 0;
    }

    pub fn spent(&self) -> usize {
        self.spent
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Result of one preamble search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A window matched at `phase`; `consumed_tail` further preamble bytes
    /// were read so the stream now sits right after the preamble.
    Matched { phase: usize, consumed_tail: usize },
    /// No window matched within the retry budget.
    BudgetExhausted { attempts: usize },
}

/// Searches the byte stream for the preamble, window by window.
#[derive(Debug, Clone)]
pub struct PreambleScanner {
    preamble: Preamble,
    budget: RetryBudget,
    watch: TokenWatch,
}

impl PreambleScanner {
    pub fn new(preamble: Preamble, retry_budget: usize) -> Self {
        Self {
            preamble,
            budget: RetryBudget::new(retry_budget),
            watch: TokenWatch::new(),
        }
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Read windows until one matches the preamble or the retry budget runs
    /// out. Each call starts with a fresh budget; a control token seen
    /// between windows resets it. Non-matching bytes are discarded.
    pub fn scan<T: ByteTransport + ?Sized>(&mut self, transport: &mut T) -> Result<ScanOutcome> {
        self.budget.reset();
        self.watch.clear();
        let mut window = vec![0u8; self.preamble.window()];

        loop {
            read_window(transport, &mut window)?;

            if let Some(phase) = self.preamble.phase_of(&window) {
                let consumed_tail = self.preamble.remaining_after(phase);
                let mut tail = vec![0u8; consumed_tail];
                read_window(transport, &mut tail)?;
                debug!(phase, consumed_tail, "preamble acquired");
                return Ok(ScanOutcome::Matched {
                    phase,
                    consumed_tail,
                });
            }

            if self.watch.observe(&window) {
                debug!(
                    attempts = self.budget.spent(),
                    "control token while scanning; retry budget reset"
                );
                self.budget.reset();
                continue;
            }

            if self.budget.spend() {
                let attempts = self.budget.spent();
                warn!(attempts, "preamble not found within retry budget");
                self.budget.reset();
                return Ok(ScanOutcome::BudgetExhausted { attempts });
            }
        }
    }
}
