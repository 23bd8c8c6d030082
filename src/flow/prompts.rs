//! Prompt copy for each conversation step.
//!
//! Everything the participant reads lives here so the transition logic in
//! `engine` stays free of wording concerns.

use super::answers::Answers;
use super::state::StateTag;

/// The opening/step prompt for a state. Used both when a step is entered and
/// when back navigation returns to it.
pub fn step_prompt(state: StateTag, answers: &Answers) -> String {
    match state {
        StateTag::ModeSelect => {
            "Hello! Let's start by choosing your response mode. \
             Do you prefer text or voice responses? (Type 'text' or 'voice')"
                .to_string()
        }
        StateTag::CollectName => match answers.response_mode {
            Some(mode) => format!(
                "Got it! You chose {mode} mode. Now, let's collect some info. \
                 What's your name?"
            ),
            None => "What's your name?".to_string(),
        },
        StateTag::CollectAge => "Great! How old are you?".to_string(),
        StateTag::CollectPhone => {
            "Would you like to share your phone number? \
             Share a contact, or send anything else to skip."
                .to_string()
        }
        StateTag::CollectLocation => {
            "Would you like to share your location? \
             Share a location, or send anything else to skip."
                .to_string()
        }
        StateTag::Confirmation => format!(
            "Please confirm your details:\n{}\nReply 'yes' to confirm or 'no' to restart.",
            answers.detail_lines()
        ),
    }
}

/// The re-prompt shown when a step's input fails validation. Only the steps
/// with real validation have distinct retry copy; the rest fall back to the
/// step prompt itself.
pub fn retry_prompt(state: StateTag, answers: &Answers) -> String {
    match state {
        StateTag::ModeSelect => "Please type 'text' or 'voice'.".to_string(),
        StateTag::CollectName => "Please tell me your name.".to_string(),
        StateTag::CollectAge => "Please enter a valid number for age.".to_string(),
        _ => step_prompt(state, answers),
    }
}

/// Shown when the participant rejects the confirmation and the flow restarts
/// from name collection.
pub fn restart_prompt() -> String {
    "Let's start over. What's your name?".to_string()
}

/// The final summary after a confirmed submission.
pub fn summary(answers: &Answers) -> String {
    let mode = answers
        .response_mode
        .map(|m| m.to_string())
        .unwrap_or_else(|| "text".to_string());
    format!(
        "Confirmed! Your details:\n{}\nResponse mode: {mode}",
        answers.detail_lines()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::answers::ResponseMode;

    fn filled() -> Answers {
        Answers {
            response_mode: Some(ResponseMode::Text),
            name: Some("Alice".to_string()),
            age: Some(30),
            ..Default::default()
        }
    }

    #[test]
    fn name_prompt_mentions_chosen_mode() {
        let prompt = step_prompt(StateTag::CollectName, &filled());
        assert!(prompt.contains("text mode"));
        assert!(prompt.contains("What's your name?"));
    }

    #[test]
    fn name_prompt_without_mode_is_generic() {
        let prompt = step_prompt(StateTag::CollectName, &Answers::default());
        assert_eq!(prompt, "What's your name?");
    }

    #[test]
    fn confirmation_prompt_lists_details() {
        let prompt = step_prompt(StateTag::Confirmation, &filled());
        assert!(prompt.contains("Name: Alice"));
        assert!(prompt.contains("Age: 30"));
        assert!(prompt.contains("'yes'"));
    }

    #[test]
    fn retry_prompts_are_specific_where_validation_exists() {
        let answers = Answers::default();
        assert!(retry_prompt(StateTag::ModeSelect, &answers).contains("'text' or 'voice'"));
        assert!(retry_prompt(StateTag::CollectAge, &answers).contains("valid number"));
        // Steps without validation fall back to their step prompt.
        assert_eq!(
            retry_prompt(StateTag::Confirmation, &answers),
            step_prompt(StateTag::Confirmation, &answers)
        );
    }

    #[test]
    fn summary_includes_mode_and_details() {
        let text = summary(&filled());
        assert!(text.contains("Alice"));
        assert!(text.contains("30"));
        assert!(text.contains("Response mode: text"));
    }
}
