/// Position management: single-slot lifecycle with a ratcheting trailing stop
///
/// **Key Design Principles:**
/// 1. The machine emits **intents**, never assumes fills
/// 2. **Ratchet invariant**: stops may tighten, never loosen
/// 3. At most one open position per engine
///
/// **Module Structure:**
/// - `intent`: Trade intents (open long/short, close)
/// - `ratchet`: One-way stop level
/// - `machine`: Position lifecycle state machine
pub mod intent;
pub mod machine;
pub mod ratchet;

pub use intent::TradeIntent;
pub use machine::{
    BarUpdate, ExitSignal, PositionConfig, PositionError, PositionState, PositionStateMachine,
};
pub use ratchet::StopRatchet;
