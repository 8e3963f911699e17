//! Function choice behaviors.
//!
//! A [`FunctionChoiceBehavior`] states which functions a model should see
//! (an explicit subset or the whole registry), how it may use them
//! ([`FunctionChoice`]) and whether the caller may invoke them
//! automatically. [`FunctionChoiceBehavior::configuration`] resolves it
//! against a [`ChoiceContext`] into a [`FunctionChoiceConfiguration`]:
//!
//! 1. Candidates: the explicit subset verbatim, else every registered
//!    function in plugin-then-registration order, else nothing.
//! 2. Selector: a [`FunctionSelector`] may replace the candidates.
//! 3. Auto-invoke check: every candidate must be registered. The first one
//!    that is not fails the whole resolution.
//!
//! | Mode | Auto-invoke | Model behavior |
//! |------|-------------|----------------|
//! | `Auto` | caller's choice, default on | may call zero or more functions |
//! | `Required` | caller's choice, default on | must call at least one |
//! | `None` | always off | sees the functions but may not call them |

pub mod behavior;
pub mod selector;

pub use behavior::{
    AdvertisedChoice, ChoiceContext, FunctionChoice, FunctionChoiceBehavior,
    FunctionChoiceConfiguration, InvocableChoice,
};
pub use selector::{CallLimitSelector, FunctionSelector, SelectorContext};
