//! Legal phase transitions.
//!
//! | From        | To          | Trigger                         |
//! |-------------|-------------|---------------------------------|
//! | Idle        | Querying    | inter-cycle delay elapsed       |
//! | Querying    | NoAction    | threshold not met               |
//! | Querying    | Dispatching | threshold met                   |
//! | NoAction    | Idle        | nothing to do                   |
//! | Dispatching | Correlating | publish acknowledged            |
//! | Correlating | Idle        | success, failure or timeout     |
//! | *any*       | Idle        | error (cycle aborted)           |

use super::CyclePhase;

/// Every forward edge of the cycle.  Returns to Idle are always legal.
pub const TRANSITIONS: [(CyclePhase, CyclePhase); 5] = [
    (CyclePhase::Idle, CyclePhase::Querying),
    (CyclePhase::Querying, CyclePhase::NoAction),
    (CyclePhase::Querying, CyclePhase::Dispatching),
    (CyclePhase::Dispatching, CyclePhase::Correlating),
    (CyclePhase::NoAction, CyclePhase::Idle),
];

/// Whether `from -> to` is allowed.
pub fn is_legal(from: CyclePhase, to: CyclePhase) -> bool {
    if from == to {
        return false;
    }
    to == CyclePhase::Idle || TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}
