//! Session state machine with validated transitions.
//!
//! A turn advances Initial -> Analyzing -> Clarifying/Querying, then
//! Querying -> Recommending -> Searching -> Detailing -> Ready. Any state may
//! fall to Error, and a new follow-up re-enters Analyzing or Querying from
//! any post-recommendation state. A turn abandoned mid-analysis may be
//! retried, so Analyzing also re-enters itself.

use shopmate_core::SessionState;

use crate::error::AssistantError;

/// Validate that a state transition is allowed.
pub fn validate_transition(from: SessionState, to: SessionState) -> Result<(), AssistantError> {
    use SessionState::*;

    let valid = match (from, to) {
        (Error, Error) => false,
        (_, Error) => true,
        (Initial, AnalyzingQuery | Querying)
        | (AnalyzingQuery, AnalyzingQuery | Clarifying | Querying)
        | (Clarifying, Clarifying | Querying)
        | (Querying, Recommending)
        | (Recommending, Searching)
        | (Searching, Detailing | Ready)
        | (Detailing, Ready) => true,
        // A follow-up turn restarts the flow after recommendations exist.
        (Recommending | Searching | Detailing | Ready | Error, AnalyzingQuery | Querying) => true,
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AssistantError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_happy_path_with_clarification() {
        let path = [
            Initial,
            AnalyzingQuery,
            Clarifying,
            Clarifying,
            Querying,
            Recommending,
            Searching,
            Detailing,
            Ready,
        ];
        for pair in path.windows(2) {
            assert!(
                validate_transition(pair[0], pair[1]).is_ok(),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_initial_with_preferences_skips_analysis() {
        assert!(validate_transition(Initial, Querying).is_ok());
    }

    #[test]
    fn test_status_safety_net_edges() {
        assert!(validate_transition(Searching, Ready).is_ok());
        assert!(validate_transition(Detailing, Ready).is_ok());
    }

    #[test]
    fn test_follow_up_reentry() {
        for from in [Recommending, Searching, Detailing, Ready, Error] {
            assert!(validate_transition(from, AnalyzingQuery).is_ok());
            assert!(validate_transition(from, Querying).is_ok());
        }
    }

    #[test]
    fn test_abandoned_analysis_can_restart() {
        assert!(validate_transition(AnalyzingQuery, AnalyzingQuery).is_ok());
        assert!(validate_transition(AnalyzingQuery, Querying).is_ok());
    }

    #[test]
    fn test_any_state_can_fail() {
        for from in SessionState::ALL {
            if from != Error {
                assert!(validate_transition(from, Error).is_ok(), "{} -> error", from);
            }
        }
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_self_transitions_rejected_except_clarifying_and_analyzing() {
        for state in SessionState::ALL {
            let result = validate_transition(state, state);
            if matches!(state, Clarifying | AnalyzingQuery) {
                assert!(result.is_ok());
            } else {
                assert!(result.is_err(), "{} -> {} should be rejected", state, state);
            }
        }
    }

    #[test]
    fn test_cannot_skip_generation() {
        assert!(validate_transition(Initial, Recommending).is_err());
        assert!(validate_transition(AnalyzingQuery, Searching).is_err());
        assert!(validate_transition(Clarifying, Ready).is_err());
        assert!(validate_transition(Querying, Detailing).is_err());
    }

    #[test]
    fn test_cannot_move_backwards_into_clarifying() {
        assert!(validate_transition(Ready, Clarifying).is_err());
        assert!(validate_transition(Querying, Clarifying).is_err());
        assert!(validate_transition(Error, Clarifying).is_err());
        assert!(validate_transition(Ready, Initial).is_err());
    }

    #[test]
    fn test_invalid_transition_error_names_states() {
        let err = validate_transition(Ready, Detailing).unwrap_err();
        assert!(matches!(err, AssistantError::InvalidTransition(Ready, Detailing)));
    }

    #[test]
    fn test_all_valid_transitions_count() {
        let mut valid_count = 0;
        for from in SessionState::ALL {
            for to in SessionState::ALL {
                if validate_transition(from, to).is_ok() {
                    valid_count += 1;
                }
            }
        }
        assert_eq!(valid_count, 30, "Expected exactly 30 valid transitions");
    }
}
