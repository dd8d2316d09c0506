//! Token cost estimation for one exchange.
//!
//! Costs are approximations: user input is sized by character count, the
//! reply by a step function of the input size, and retrieval and system
//! instructions by fixed overheads.

use citebase_types::budget::TokenCostBreakdown;
use citebase_types::config::{CostConfig, ResponseBand};

/// Estimates the token cost of an exchange.
#[derive(Debug, Clone)]
pub struct CostModel {
    chars_per_token: u64,
    knowledge_base_tokens: u64,
    system_instruction_tokens: u64,
    response_bands: Vec<ResponseBand>,
    max_response_tokens: u64,
}

impl CostModel {
    pub fn new(config: &CostConfig) -> Self {
        Self {
            chars_per_token: u64::from(config.chars_per_token.max(1)),
            knowledge_base_tokens: config.knowledge_base_tokens,
            system_instruction_tokens: config.system_instruction_tokens,
            response_bands: config.response_bands.clone(),
            max_response_tokens: config.max_response_tokens,
        }
    }

    /// `ceil(chars / chars_per_token)`, counting characters rather than bytes.
    pub fn estimate_tokens(&self, text: &str) -> u64 {
        let chars = text.chars().count() as u64;
        chars.div_ceil(self.chars_per_token)
    }

    /// Expected reply size for an input of `user_input` tokens.
    ///
    /// Zero for empty input; otherwise the first band whose `below` exceeds
    /// the input, falling through to `max_response_tokens`.
    pub fn expected_response(&self, user_input: u64) -> u64 {
        if user_input == 0 {
            return 0;
        }
        self.response_bands
            .iter()
            .find(|band| user_input < band.below)
            .map(|band| band.tokens)
            .unwrap_or(self.max_response_tokens)
    }

    /// Full cost breakdown for sending `input` on top of `history_tokens`.
    pub fn breakdown(
        &self,
        input: &str,
        knowledge_base_enabled: bool,
        history_tokens: u64,
    ) -> TokenCostBreakdown {
        let user_input = self.estimate_tokens(input);
        let expected_response = self.expected_response(user_input);
        let knowledge_base = if knowledge_base_enabled {
            self.knowledge_base_tokens
        } else {
            0
        };
        let system_instructions = self.system_instruction_tokens;

        TokenCostBreakdown {
            user_input,
            expected_response,
            knowledge_base,
            system_instructions,
            conversation_history: history_tokens,
            total: user_input
                + expected_response
                + knowledge_base
                + system_instructions
                + history_tokens,
        }
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(&CostConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        let model = CostModel::default();
        assert_eq!(model.estimate_tokens(""), 0);
        assert_eq!(model.estimate_tokens("a"), 1);
        assert_eq!(model.estimate_tokens("abcd"), 1);
        assert_eq!(model.estimate_tokens("abcde"), 2);
        assert_eq!(model.estimate_tokens(&"x".repeat(80)), 20);
    }

    #[test]
    fn test_estimate_tokens_counts_chars_not_bytes() {
        let model = CostModel::default();
        // four two-byte characters
        assert_eq!(model.estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_expected_response_bands() {
        let model = CostModel::default();
        assert_eq!(model.expected_response(0), 0);
        assert_eq!(model.expected_response(1), 100);
        assert_eq!(model.expected_response(19), 100);
        assert_eq!(model.expected_response(20), 250);
        assert_eq!(model.expected_response(49), 250);
        assert_eq!(model.expected_response(50), 400);
        assert_eq!(model.expected_response(99), 400);
        assert_eq!(model.expected_response(100), 600);
        assert_eq!(model.expected_response(10_000), 600);
    }

    #[test]
    fn test_breakdown_eighty_chars_with_knowledge_base() {
        let model = CostModel::default();
        let input = "x".repeat(80);
        let breakdown = model.breakdown(&input, true, 0);
        assert_eq!(breakdown.user_input, 20);
        assert_eq!(breakdown.expected_response, 250);
        assert_eq!(breakdown.knowledge_base, 850);
        assert_eq!(breakdown.system_instructions, 180);
        assert_eq!(breakdown.conversation_history, 0);
        assert_eq!(breakdown.total, 1_300);
        assert_eq!(breakdown.new_tokens(), 1_300);
    }

    #[test]
    fn test_breakdown_includes_history_in_total_only() {
        let model = CostModel::default();
        let breakdown = model.breakdown("hello", false, 5_000);
        // 5 chars -> 2 tokens -> 100 response
        assert_eq!(breakdown.user_input, 2);
        assert_eq!(breakdown.expected_response, 100);
        assert_eq!(breakdown.knowledge_base, 0);
        assert_eq!(breakdown.total, 2 + 100 + 180 + 5_000);
        assert_eq!(breakdown.new_tokens(), 282);
    }

    #[test]
    fn test_empty_input_still_costs_system_instructions() {
        let model = CostModel::default();
        let breakdown = model.breakdown("", true, 0);
        assert_eq!(breakdown.user_input, 0);
        assert_eq!(breakdown.expected_response, 0);
        assert_eq!(breakdown.total, 850 + 180);
    }

    #[test]
    fn test_custom_config() {
        let config = CostConfig {
            chars_per_token: 2,
            knowledge_base_tokens: 100,
            system_instruction_tokens: 10,
            response_bands: vec![ResponseBand {
                below: 5,
                tokens: 7,
            }],
            max_response_tokens: 9,
        };
        let model = CostModel::new(&config);
        assert_eq!(model.estimate_tokens("abc"), 2);
        assert_eq!(model.expected_response(4), 7);
        assert_eq!(model.expected_response(5), 9);
    }
}
