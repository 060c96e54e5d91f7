// ============================================================
// Layer 5 — Reduce-on-Plateau Learning Rate Scheduler
// ============================================================
// Watches the validation accuracy once per epoch ("max" mode):
//
//   improved  = metric > best * (1 + threshold)
//   improved  → best = metric, stagnant = 0
//   otherwise → stagnant += 1
//   stagnant > patience → lr *= factor, stagnant = 0
//
// With patience = 3 and factor = 0.5 the rate halves on the
// fourth epoch in a row without a relative gain of 1e-4.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateauConfig {
    pub patience:  usize,
    pub factor:    f64,
    pub threshold: f64,
    pub min_lr:    f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self { patience: 3, factor: 0.5, threshold: 1e-4, min_lr: 0.0 }
    }
}

#[derive(Debug, Clone)]
pub struct ReduceOnPlateau {
    config:   PlateauConfig,
    lr:       f64,
    best:     Option<f64>,
    stagnant: usize,
}

impl ReduceOnPlateau {
    pub fn new(initial_lr: f64, config: PlateauConfig) -> Self {
        Self { config, lr: initial_lr, best: None, stagnant: 0 }
    }

    /// The learning rate to use for the next epoch.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Record one epoch's metric (higher is better) and return the
    /// possibly reduced learning rate.
    pub fn step(&mut self, metric: f64) -> f64 {
        let improved = match self.best {
            None       => true,
            Some(best) => metric > best * (1.0 + self.config.threshold),
        };

        if improved {
            self.best     = Some(metric);
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }

        if self.stagnant > self.config.patience {
            let reduced = (self.lr * self.config.factor).max(self.config.min_lr);
            if reduced < self.lr {
                tracing::info!("Reducing learning rate {:.2e} → {:.2e}", self.lr, reduced);
            }
            self.lr       = reduced;
            self.stagnant = 0;
        }

        self.lr
    }
}
