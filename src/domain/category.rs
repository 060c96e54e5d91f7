// ============================================================
// Layer 3 — Category Domain Type
// ============================================================
// The shape categories the classifier distinguishes.
//
// The order of `Category::ALL` defines the default label space:
// circle = 0, square = 1, ... star = 5. The exported model and
// the browser client both rely on this order, so it never changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Circle,
    Square,
    Triangle,
    Hexagon,
    Octagon,
    Star,
}

impl Category {
    /// Every category in label order.
    pub const ALL: [Category; 6] = [
        Category::Circle,
        Category::Square,
        Category::Triangle,
        Category::Hexagon,
        Category::Octagon,
        Category::Star,
    ];

    /// The lowercase name used by the QuickDraw bucket and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Category::Circle   => "circle",
            Category::Square   => "square",
            Category::Triangle => "triangle",
            Category::Hexagon  => "hexagon",
            Category::Octagon  => "octagon",
            Category::Star     => "star",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!(
                "Unknown category '{}'. Expected one of: {}",
                s,
                Category::ALL.map(|c| c.name()).join(", ")
            ))
    }
}
