use crate::domain::generation::GenerationRequest;
use crate::infrastructure::response::DRAFT_KEYS;

/// System message for chat-completion backends.
pub const SYSTEM_PROMPT: &str =
    "You are an expert test case generator. Generate comprehensive test cases in JSON format.";

const EXAMPLE_VALUES: [&str; 6] = [
    "Test case title",
    "Prerequisites for the test",
    "Step-by-step instructions",
    "Test data needed",
    "Expected outcome",
    "Relevant tags",
];

/// Renders the instruction sent to every backend for `request`.
pub fn build_instruction(request: &GenerationRequest) -> String {
    let mut body = String::new();
    body.push_str("Generate comprehensive test cases for the following JIRA ticket:\n\n");
    body.push_str(&format!("JIRA Ticket: {}\n", request.ticket_id));
    body.push_str(&format!("Priority: {}\n", request.priority));
    body.push_str(&format!(
        "Acceptance Criteria: {}\n\n",
        request.acceptance_criteria
    ));

    body.push_str("Please generate 3-5 test cases that cover:\n");
    body.push_str("1. Happy path scenarios\n");
    body.push_str("2. Edge cases\n");
    body.push_str("3. Negative test scenarios\n");
    body.push_str("4. Boundary conditions\n\n");

    body.push_str("Return the response as a JSON array with the following structure:\n");
    body.push_str("[\n  {\n");
    let fields: Vec<String> = DRAFT_KEYS
        .iter()
        .zip(EXAMPLE_VALUES.iter())
        .map(|(key, example)| format!("    \"{}\": \"{}\"", key, example))
        .collect();
    body.push_str(&fields.join(",\n"));
    body.push_str("\n  }\n]\n\n");

    body.push_str("Make sure each test case is detailed and actionable. ");
    body.push_str("Return ONLY the JSON array, no additional text or formatting.\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::Priority;

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "AUTH-101",
            Priority::High,
            "User should be able to login with valid email and password",
        )
    }

    #[test]
    fn test_instruction_embeds_request_fields() {
        let instruction = build_instruction(&request());
        assert!(instruction.contains("JIRA Ticket: AUTH-101"));
        assert!(instruction.contains("Priority: High"));
        assert!(instruction
            .contains("Acceptance Criteria: User should be able to login with valid email and password"));
        assert!(instruction.contains("3-5 test cases"));
        for scenario in ["Happy path", "Edge cases", "Negative", "Boundary"] {
            assert!(instruction.contains(scenario), "missing {}", scenario);
        }
    }

    #[test]
    fn test_instruction_lists_every_contract_key() {
        let instruction = build_instruction(&request());
        for key in DRAFT_KEYS {
            assert!(instruction.contains(&format!("\"{}\":", key)), "missing {}", key);
        }
        assert!(instruction.contains("Return ONLY the JSON array"));
    }

    #[test]
    fn test_instruction_is_deterministic() {
        assert_eq!(build_instruction(&request()), build_instruction(&request()));
    }
}
